//! CLI commands module.

mod identity;
mod search;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use increator_kv::{KVStore, RedbStore};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Cli;
use crate::config::Config;

pub use identity::{ClustersCommand, IngestCommand, PairCommand, ResolveCommand};
pub use search::{IndexCommand, SearchCommand, SmokeCommand};

/// Open the shared redb file, creating the data directory if needed.
pub(crate) fn open_store(cfg: &Config) -> Result<Arc<dyn KVStore>> {
    let path = cfg.db_path()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let store = RedbStore::open(&path).with_context(|| format!("open {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Read a YAML (or JSON, which YAML accepts) file.
pub(crate) fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

/// Print `value` to stdout as YAML, or JSON with `--json`.
pub(crate) fn output_result<T: Serialize>(cli: &Cli, value: &T) -> Result<()> {
    let out = if cli.json {
        serde_json::to_string_pretty(value)?
    } else {
        serde_yaml::to_string(value)?
    };
    println!("{}", out.trim_end());
    Ok(())
}

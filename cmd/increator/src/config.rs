//! CLI configuration.
//!
//! Loaded from `~/.increator/config.yaml` (or `--config`), then overridden by
//! `INCREATOR_*` environment variables. A missing default file means
//! defaults; a missing explicit file is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_DIR: &str = ".increator";
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
pub const DB_FILE: &str = "increator.redb";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Offline feature hashing.
    #[default]
    Hash,
    /// OpenAI-compatible `/embeddings` endpoint.
    Openai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub provider: Provider,
    pub model: String,
    pub dimension: usize,
    pub base_url: String,
    pub api_key: String,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            provider: Provider::Hash,
            model: String::new(),
            dimension: 1536,
            base_url: String::new(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSection {
    pub top_k: usize,
    pub timeout_ms: u64,
    pub boost: f32,
    pub keywords: Vec<String>,
    /// Metadata fields searched for keywords.
    pub fields: Vec<String>,
}

impl Default for RankingSection {
    fn default() -> Self {
        Self {
            top_k: 500,
            timeout_ms: 2000,
            boost: 0.1,
            keywords: vec!["AI".into(), "Tech".into()],
            fields: vec!["bio".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    pub batch_size: usize,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeSection {
    pub latency_slo_ms: u64,
}

impl Default for SmokeSection {
    fn default() -> Self {
        Self { latency_slo_ms: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the redb file lives. Defaults to `~/.increator/data`.
    pub data_dir: Option<PathBuf>,
    pub namespace: String,
    pub embedding: EmbeddingSection,
    pub ranking: RankingSection,
    pub worker: WorkerSection,
    pub smoke: SmokeSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            namespace: "prod".into(),
            embedding: EmbeddingSection::default(),
            ranking: RankingSection::default(),
            worker: WorkerSection::default(),
            smoke: SmokeSection::default(),
        }
    }
}

fn base_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not find home directory")?;
    Ok(home.join(DEFAULT_BASE_DIR))
}

impl Config {
    /// Load from `path`, or the default location, then apply the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = base_dir()?.join(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply `INCREATOR_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("INCREATOR_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("INCREATOR_NAMESPACE") {
            self.namespace = v;
        }
        if let Some(v) = lookup("INCREATOR_EMBED_API_KEY") {
            self.embedding.api_key = v;
        }
        if let Some(v) = lookup("INCREATOR_EMBED_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Some(v) = lookup("INCREATOR_EMBED_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = lookup("INCREATOR_EMBED_DIM") {
            self.embedding.dimension = v
                .parse()
                .with_context(|| format!("INCREATOR_EMBED_DIM={v}"))?;
        }
        if let Some(v) = lookup("INCREATOR_SEARCH_TIMEOUT_MS") {
            self.ranking.timeout_ms = v
                .parse()
                .with_context(|| format!("INCREATOR_SEARCH_TIMEOUT_MS={v}"))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            bail!("namespace must not be empty");
        }
        if self.embedding.dimension == 0 {
            bail!("embedding.dimension must be positive");
        }
        if self.worker.batch_size == 0 {
            bail!("worker.batch_size must be positive");
        }
        Ok(())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(d) => Ok(d.clone()),
            None => Ok(base_dir()?.join("data")),
        }
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(DB_FILE))
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.ranking.timeout_ms)
    }

    pub fn latency_slo(&self) -> Duration {
        Duration::from_millis(self.smoke.latency_slo_ms)
    }
}

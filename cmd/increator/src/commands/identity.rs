//! Identity resolution commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use increator_identity::{
    ClusterBuilder, ConsolidatedIdentity, CreatorStore, IngestOutcome, Matcher, Profile, ProfileId,
    Suggestion,
};
use serde::Serialize;
use tracing::info;

use super::{load_yaml, open_store, output_result};
use crate::Cli;
use crate::config::Config;

/// Compare two profiles without touching storage.
#[derive(Args)]
pub struct ResolveCommand {
    /// First profile (YAML or JSON)
    a: PathBuf,
    /// Second profile (YAML or JSON)
    b: PathBuf,
}

impl ResolveCommand {
    pub fn run(&self, cli: &Cli) -> Result<()> {
        let a: Profile = load_yaml(&self.a)?;
        let b: Profile = load_yaml(&self.b)?;
        a.validate()?;
        b.validate()?;
        output_result(cli, &Matcher::new().resolve(&a, &b))
    }
}

/// Ingest a list of profiles.
#[derive(Args)]
pub struct IngestCommand {
    /// Profiles file: a YAML or JSON list
    file: PathBuf,
}

#[derive(Debug, Default, Serialize)]
struct IngestSummary {
    profiles: usize,
    decisions: usize,
    merged: usize,
    already_linked: usize,
    queued: usize,
    ignored: usize,
    clusters: usize,
    pending: Vec<Suggestion>,
}

impl IngestCommand {
    pub fn run(&self, cli: &Cli, cfg: &Config) -> Result<()> {
        let incoming: Vec<Profile> = load_yaml(&self.file)?;
        let store = open_store(cfg)?;
        let creators = CreatorStore::new(store.clone());
        let builder = ClusterBuilder::open(store)?;

        for p in &incoming {
            creators.insert(p)?;
            builder.register(&p.id)?;
        }

        // New profiles are compared against everything already stored.
        let all = creators.list()?;
        let mut summary = IngestSummary {
            profiles: incoming.len(),
            ..IngestSummary::default()
        };
        for pair in Matcher::new().resolve_all(&all) {
            builder.register(&pair.a)?;
            builder.register(&pair.b)?;
            summary.decisions += 1;
            match builder.ingest(&pair.decision, &pair.a, &pair.b)? {
                IngestOutcome::Merged { .. } => summary.merged += 1,
                IngestOutcome::AlreadyLinked { .. } => summary.already_linked += 1,
                IngestOutcome::Queued => summary.queued += 1,
                IngestOutcome::Ignored => summary.ignored += 1,
            }
        }
        summary.clusters = builder.clusters().len();
        summary.pending = builder.pending_suggestions()?;

        info!(
            profiles = summary.profiles,
            merged = summary.merged,
            queued = summary.queued,
            "increator: ingest complete"
        );
        output_result(cli, &summary)
    }
}

/// A pair of profile ids.
#[derive(Args)]
pub struct PairCommand {
    a: String,
    b: String,
}

#[derive(Serialize)]
struct PairResult<T: Serialize> {
    a: String,
    b: String,
    #[serde(flatten)]
    result: T,
}

#[derive(Serialize)]
struct Flag {
    ok: bool,
}

impl PairCommand {
    fn ids(&self) -> (ProfileId, ProfileId) {
        (ProfileId::from(self.a.as_str()), ProfileId::from(self.b.as_str()))
    }

    fn report<T: Serialize>(&self, cli: &Cli, result: T) -> Result<()> {
        output_result(
            cli,
            &PairResult {
                a: self.a.clone(),
                b: self.b.clone(),
                result,
            },
        )
    }

    pub fn confirm(&self, cli: &Cli, cfg: &Config) -> Result<()> {
        let (a, b) = self.ids();
        let builder = ClusterBuilder::open(open_store(cfg)?)?;
        let identity = match builder.confirm_match(&a, &b)? {
            IngestOutcome::Merged { identity } | IngestOutcome::AlreadyLinked { identity } => {
                identity
            }
            _ => builder.find(&a)?,
        };
        self.report(cli, serde_json::json!({ "identity": identity }))
    }

    pub fn dismiss(&self, cli: &Cli, cfg: &Config) -> Result<()> {
        let (a, b) = self.ids();
        let builder = ClusterBuilder::open(open_store(cfg)?)?;
        let ok = builder.dismiss_suggestion(&a, &b)?;
        self.report(cli, Flag { ok })
    }

    pub fn retract(&self, cli: &Cli, cfg: &Config) -> Result<()> {
        let (a, b) = self.ids();
        let builder = ClusterBuilder::open(open_store(cfg)?)?;
        let removed = builder.retract(&a, &b)?;
        self.report(
            cli,
            serde_json::json!({
                "removed": removed,
                "identity_a": builder.find(&a)?,
                "identity_b": builder.find(&b)?,
            }),
        )
    }
}

/// List every cluster with consolidated stats.
#[derive(Args)]
pub struct ClustersCommand {
    /// Only clusters with more than one member
    #[arg(long)]
    merged_only: bool,
}

#[derive(Serialize)]
struct ClusterListing {
    clusters: Vec<ConsolidatedIdentity>,
    pending: Vec<Suggestion>,
}

impl ClustersCommand {
    pub fn run(&self, cli: &Cli, cfg: &Config) -> Result<()> {
        let store = open_store(cfg)?;
        let creators = CreatorStore::new(store.clone());
        let builder = ClusterBuilder::open(store)?;

        let mut clusters = Vec::new();
        for (identity, members) in builder.clusters() {
            if self.merged_only && members.len() < 2 {
                continue;
            }
            clusters.push(builder.consolidate(&identity, &creators)?);
        }
        output_result(
            cli,
            &ClusterListing {
                clusters,
                pending: builder.pending_suggestions()?,
            },
        )
    }
}

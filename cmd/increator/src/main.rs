//! increator - creator identity resolution and search.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{
    ClustersCommand, IndexCommand, IngestCommand, PairCommand, ResolveCommand, SearchCommand,
    SmokeCommand,
};
use config::Config;

/// Creator identity resolution and search.
///
/// Profiles, identity edges, clusters and indexed vectors share one redb
/// file under the configured data directory (default ~/.increator/data).
#[derive(Parser)]
#[command(name = "increator")]
#[command(about = "Creator identity resolution and search")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.increator/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON instead of YAML
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare two profile files and print the match decision
    Resolve(ResolveCommand),
    /// Store profiles, resolve every pair and fold matches into clusters
    Ingest(IngestCommand),
    /// Confirm a pair as the same creator
    Confirm(PairCommand),
    /// Drop a queued suggestion without merging
    Dismiss(PairCommand),
    /// Remove the edge between two profiles and rebuild clusters
    Retract(PairCommand),
    /// List clusters and pending suggestions
    Clusters(ClustersCommand),
    /// Embed and index creator texts
    Index(IndexCommand),
    /// Search indexed creators by text
    Search(SearchCommand),
    /// Run a search and check it against the latency SLO
    Smoke(SmokeCommand),
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Resolve(cmd) => cmd.run(&cli),
        Commands::Ingest(cmd) => cmd.run(&cli, &cfg),
        Commands::Confirm(cmd) => cmd.confirm(&cli, &cfg),
        Commands::Dismiss(cmd) => cmd.dismiss(&cli, &cfg),
        Commands::Retract(cmd) => cmd.retract(&cli, &cfg),
        Commands::Clusters(cmd) => cmd.run(&cli, &cfg),
        Commands::Index(cmd) => cmd.run(&cli, &cfg).await,
        Commands::Search(cmd) => cmd.run(&cli, &cfg).await,
        Commands::Smoke(cmd) => cmd.run(&cli, &cfg).await,
    }
}

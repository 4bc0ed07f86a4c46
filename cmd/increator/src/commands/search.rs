//! Indexing and search commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, bail};
use clap::Args;
use increator_embed::{EmbedConfig, Embedder, HashEmbedder, OpenAI};
use increator_kv::KVStore;
use increator_ranking::{
    EmbeddingJob, EmbeddingWorker, KeywordBoost, PipelineConfig, RankingPipeline, SearchOutcome,
    WorkerConfig, smoke,
};
use increator_vecstore::{KvIndex, VecIndex};
use serde::Serialize;

use super::{load_yaml, open_store, output_result};
use crate::Cli;
use crate::config::{Config, Provider};

fn build_embedder(cfg: &Config) -> Result<Arc<dyn Embedder>> {
    let e = &cfg.embedding;
    let embedder: Arc<dyn Embedder> = match e.provider {
        Provider::Hash => Arc::new(HashEmbedder::new(e.dimension)),
        Provider::Openai => {
            let ec = EmbedConfig::new(e.api_key.clone())
                .with_model(&e.model)
                .with_dimension(e.dimension)
                .with_base_url(&e.base_url)
                .with_timeout(cfg.search_timeout());
            Arc::new(OpenAI::new(ec)?)
        }
    };
    Ok(embedder)
}

fn build_index(cfg: &Config, store: Arc<dyn KVStore>) -> Arc<dyn VecIndex> {
    Arc::new(KvIndex::new(store).with_dimension(cfg.embedding.dimension))
}

fn build_pipeline(cfg: &Config) -> Result<RankingPipeline> {
    let index = build_index(cfg, open_store(cfg)?);
    let pc = PipelineConfig::default()
        .with_top_k(cfg.ranking.top_k)
        .with_namespace(&cfg.namespace)
        .with_timeout(cfg.search_timeout());
    Ok(RankingPipeline::new(index, pc)
        .with_embedder(build_embedder(cfg)?)
        .with_booster(Arc::new(
            KeywordBoost::new(cfg.ranking.keywords.iter().cloned(), cfg.ranking.boost)
                .with_fields(cfg.ranking.fields.iter().cloned()),
        )))
}

/// Embed and index jobs from a file.
#[derive(Args)]
pub struct IndexCommand {
    /// Jobs file: a YAML or JSON list of {id, text, metadata}
    file: PathBuf,
}

impl IndexCommand {
    pub async fn run(&self, cli: &Cli, cfg: &Config) -> Result<()> {
        let jobs: Vec<EmbeddingJob> = load_yaml(&self.file)?;
        let index = build_index(cfg, open_store(cfg)?);
        let worker = EmbeddingWorker::new(
            build_embedder(cfg)?,
            index,
            WorkerConfig::default()
                .with_batch_size(cfg.worker.batch_size)
                .with_namespace(&cfg.namespace),
        );
        let report = worker.process_batch(&jobs).await?;
        output_result(cli, &report)
    }
}

/// Search creators by free text.
#[derive(Args)]
pub struct SearchCommand {
    /// Query text
    query: String,

    /// Number of candidates to retrieve (default from config)
    #[arg(long)]
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    latency_ms: u128,
    #[serde(flatten)]
    outcome: SearchOutcome,
}

impl SearchCommand {
    pub async fn run(&self, cli: &Cli, cfg: &Config) -> Result<()> {
        let pipeline = build_pipeline(cfg)?;
        let start = Instant::now();
        let outcome = pipeline.search_text(&self.query, self.top_k, None).await;
        output_result(
            cli,
            &SearchResponse {
                query: self.query.clone(),
                latency_ms: start.elapsed().as_millis(),
                outcome,
            },
        )
    }
}

/// Probe search latency.
#[derive(Args)]
pub struct SmokeCommand {
    /// Query text
    #[arg(default_value = "tech reviewers")]
    query: String,
}

impl SmokeCommand {
    pub async fn run(&self, cli: &Cli, cfg: &Config) -> Result<()> {
        let pipeline = build_pipeline(cfg)?;
        let report = smoke::run(&pipeline, &self.query, cfg.latency_slo()).await;
        output_result(cli, &report)?;
        if !report.passed() {
            bail!(
                "smoke failed: {} hits in {} ms (slo {} ms)",
                report.hits,
                report.latency_ms,
                report.slo_ms
            );
        }
        Ok(())
    }
}

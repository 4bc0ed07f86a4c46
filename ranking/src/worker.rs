use std::sync::Arc;

use increator_embed::Embedder;
use increator_vecstore::{Metadata, VecIndex, VectorRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RankingError, Result};
use crate::pipeline::DEFAULT_NAMESPACE;

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Text to embed and index under `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingJob {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Texts per `embed_batch` call.
    pub batch_size: usize,
    pub namespace: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub embedded: usize,
    pub upserted: usize,
}

/// Embeds job texts and upserts the vectors into the index.
pub struct EmbeddingWorker {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VecIndex>,
    config: WorkerConfig,
}

impl EmbeddingWorker {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VecIndex>, config: WorkerConfig) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Process `jobs` in chunks of the configured batch size. A failing chunk
    /// stops the run; chunks before it stay indexed.
    pub async fn process_batch(&self, jobs: &[EmbeddingJob]) -> Result<BatchReport> {
        for job in jobs {
            if job.id.is_empty() || job.text.trim().is_empty() {
                return Err(RankingError::InvalidJob {
                    id: job.id.clone(),
                    reason: "id and text are required".into(),
                });
            }
        }

        let mut report = BatchReport::default();
        for chunk in jobs.chunks(self.config.batch_size.max(1)) {
            let texts: Vec<&str> = chunk.iter().map(|j| j.text.as_str()).collect();
            let embeddings = self
                .embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| RankingError::upstream("embed batch", e))?;
            if embeddings.len() != chunk.len() {
                return Err(RankingError::upstream(
                    "embed batch",
                    format!("{} vectors for {} texts", embeddings.len(), chunk.len()),
                ));
            }
            report.embedded += embeddings.len();

            let records = chunk
                .iter()
                .zip(embeddings)
                .map(|(job, v)| VectorRecord::new(job.id.clone(), v).with_metadata(job.metadata.clone()))
                .collect();
            report.upserted += self
                .index
                .upsert(records, &self.config.namespace)
                .await
                .map_err(|e| RankingError::upstream("upsert", e))?;
            debug!(chunk = chunk.len(), "ranking: chunk indexed");
        }

        info!(
            embedded = report.embedded,
            upserted = report.upserted,
            namespace = %self.config.namespace,
            "ranking: batch indexed"
        );
        Ok(report)
    }
}

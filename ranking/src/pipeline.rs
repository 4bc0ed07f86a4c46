use std::sync::Arc;
use std::time::{Duration, Instant};

use increator_embed::Embedder;
use increator_vecstore::{Filter, VecIndex};
use tracing::{debug, warn};

use crate::boost::{Booster, KeywordBoost};
use crate::types::{Candidate, SearchOutcome};

pub const DEFAULT_TOP_K: usize = 500;
pub const DEFAULT_NAMESPACE: &str = "prod";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Builder-style settings for [`RankingPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub top_k: usize,
    pub namespace: String,
    /// Upper bound on each upstream call (embed, then retrieve).
    pub timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Retrieve, rerank, sort.
///
/// Stateless per call and safe to share across tasks. Upstream failures
/// never surface as errors: they yield an empty, degraded outcome.
pub struct RankingPipeline {
    index: Arc<dyn VecIndex>,
    embedder: Option<Arc<dyn Embedder>>,
    booster: Arc<dyn Booster>,
    config: PipelineConfig,
}

impl RankingPipeline {
    pub fn new(index: Arc<dyn VecIndex>, config: PipelineConfig) -> Self {
        Self {
            index,
            embedder: None,
            booster: Arc::new(KeywordBoost::default()),
            config,
        }
    }

    /// Required for [`RankingPipeline::search_text`].
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_booster(mut self, booster: Arc<dyn Booster>) -> Self {
        self.booster = booster;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ranked candidates for `embedding`. Empty on no matches and on
    /// upstream failure alike; use [`RankingPipeline::search_outcome`] to
    /// tell them apart.
    pub async fn search(
        &self,
        embedding: &[f32],
        top_k: Option<usize>,
        filter: Option<&Filter>,
    ) -> Vec<Candidate> {
        self.search_outcome(embedding, top_k, filter).await.candidates
    }

    pub async fn search_outcome(
        &self,
        embedding: &[f32],
        top_k: Option<usize>,
        filter: Option<&Filter>,
    ) -> SearchOutcome {
        let top_k = top_k.unwrap_or(self.config.top_k);
        let start = Instant::now();

        let query = self
            .index
            .query(embedding, top_k, &self.config.namespace, filter);
        let matches = match tokio::time::timeout(self.config.timeout, query).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                warn!(error = %e, namespace = %self.config.namespace, "ranking: retrieval failed");
                return SearchOutcome::degraded(e.to_string());
            }
            Err(_) => {
                warn!(timeout = ?self.config.timeout, "ranking: retrieval timed out");
                return SearchOutcome::degraded(format!(
                    "retrieval timed out after {:?}",
                    self.config.timeout
                ));
            }
        };

        let candidates = self.rerank(matches.into_iter().map(Candidate::from).collect());
        debug!(
            hits = candidates.len(),
            top_k,
            elapsed = ?start.elapsed(),
            "ranking: search complete"
        );
        SearchOutcome::complete(candidates)
    }

    /// Embed `text`, then search. An embedding failure degrades the same
    /// way a retrieval failure does.
    pub async fn search_text(
        &self,
        text: &str,
        top_k: Option<usize>,
        filter: Option<&Filter>,
    ) -> SearchOutcome {
        let Some(embedder) = &self.embedder else {
            warn!("ranking: text search without an embedder");
            return SearchOutcome::degraded("no embedder configured");
        };

        let embedding = match tokio::time::timeout(self.config.timeout, embedder.embed(text)).await
        {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                warn!(error = %e, "ranking: query embedding failed");
                return SearchOutcome::degraded(e.to_string());
            }
            Err(_) => {
                warn!(timeout = ?self.config.timeout, "ranking: query embedding timed out");
                return SearchOutcome::degraded(format!(
                    "embedding timed out after {:?}",
                    self.config.timeout
                ));
            }
        };
        self.search_outcome(&embedding, top_k, filter).await
    }

    /// Apply the booster and sort by descending final score. The sort is
    /// stable, so equal scores keep retrieval order.
    pub fn rerank(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        for c in &mut candidates {
            c.final_score = c.retrieval_score + self.booster.boost(c);
        }
        candidates.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        candidates
    }
}

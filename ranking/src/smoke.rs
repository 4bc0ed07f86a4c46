use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::pipeline::RankingPipeline;
use crate::types::ResultStatus;

pub const DEFAULT_LATENCY_SLO: Duration = Duration::from_millis(500);

/// Result of a single end-to-end search probe.
#[derive(Debug, Clone, Serialize)]
pub struct SmokeReport {
    pub query: String,
    pub hits: usize,
    #[serde(flatten)]
    pub status: ResultStatus,
    pub latency_ms: u128,
    pub slo_ms: u128,
}

impl SmokeReport {
    pub fn slo_met(&self) -> bool {
        self.latency_ms < self.slo_ms
    }

    /// Healthy means the index answered with at least one hit within the SLO.
    pub fn passed(&self) -> bool {
        self.hits > 0 && self.status == ResultStatus::Complete && self.slo_met()
    }
}

/// Run one text search and time it against `slo`.
pub async fn run(pipeline: &RankingPipeline, query: &str, slo: Duration) -> SmokeReport {
    let start = Instant::now();
    let outcome = pipeline.search_text(query, None, None).await;
    let report = SmokeReport {
        query: query.to_string(),
        hits: outcome.candidates.len(),
        status: outcome.status,
        latency_ms: start.elapsed().as_millis(),
        slo_ms: slo.as_millis(),
    };

    if report.passed() {
        info!(hits = report.hits, latency_ms = report.latency_ms, "ranking: smoke passed");
    } else {
        warn!(
            hits = report.hits,
            latency_ms = report.latency_ms,
            slo_ms = report.slo_ms,
            "ranking: smoke failed"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use increator_embed::{Embedder, HashEmbedder};
    use increator_vecstore::{MemoryIndex, VecIndex, VectorRecord};

    use crate::pipeline::{DEFAULT_NAMESPACE, PipelineConfig};

    #[tokio::test]
    async fn test_smoke_reports_hits() {
        let embedder = Arc::new(HashEmbedder::new(32));
        let index = Arc::new(MemoryIndex::new());
        let v = embedder.embed("tech reviewers").await.unwrap();
        index
            .upsert(vec![VectorRecord::new("c1", v)], DEFAULT_NAMESPACE)
            .await
            .unwrap();

        let p = RankingPipeline::new(index, PipelineConfig::default()).with_embedder(embedder);
        let report = run(&p, "tech reviewers", Duration::from_secs(5)).await;
        assert_eq!(report.hits, 1);
        assert!(report.slo_met());
        assert!(report.passed());
    }

    #[tokio::test]
    async fn test_smoke_fails_on_empty_index() {
        let p = RankingPipeline::new(Arc::new(MemoryIndex::new()), PipelineConfig::default())
            .with_embedder(Arc::new(HashEmbedder::new(8)));
        let report = run(&p, "anything", DEFAULT_LATENCY_SLO).await;
        assert_eq!(report.hits, 0);
        assert!(!report.passed());
    }
}

//! Creator search: vector retrieval, keyword rerank, and the embedding
//! worker that feeds the index.

pub mod boost;
pub mod error;
pub mod pipeline;
pub mod smoke;
pub mod types;
pub mod worker;

pub use boost::{Booster, KeywordBoost, NoBoost};
pub use error::{RankingError, Result};
pub use pipeline::{PipelineConfig, RankingPipeline};
pub use smoke::SmokeReport;
pub use types::{Candidate, ResultStatus, SearchOutcome};
pub use worker::{BatchReport, EmbeddingJob, EmbeddingWorker, WorkerConfig};

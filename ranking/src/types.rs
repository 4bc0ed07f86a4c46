use increator_vecstore::{Match, Metadata};
use serde::Serialize;

/// One retrieval result, created per query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,

    /// Similarity reported by the index. Higher is closer.
    pub retrieval_score: f32,

    pub metadata: Metadata,

    /// Set by rerank. Equal to `retrieval_score` until then.
    pub final_score: f32,
}

impl Candidate {
    pub fn new(id: impl Into<String>, retrieval_score: f32, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            retrieval_score,
            metadata,
            final_score: retrieval_score,
        }
    }

    /// Profile bio, if the metadata carries one as a string.
    pub fn bio(&self) -> Option<&str> {
        self.metadata.get("bio").and_then(|v| v.as_str())
    }
}

impl From<Match> for Candidate {
    fn from(m: Match) -> Self {
        Candidate::new(m.id, m.score, m.metadata)
    }
}

/// Whether the index actually answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultStatus {
    /// The index answered. An empty candidate list means no matches.
    Complete,
    /// The index or embedder failed or timed out. The candidate list is
    /// empty and the caller may retry.
    Degraded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub candidates: Vec<Candidate>,
    #[serde(flatten)]
    pub status: ResultStatus,
}

impl SearchOutcome {
    pub(crate) fn complete(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            status: ResultStatus::Complete,
        }
    }

    pub(crate) fn degraded(reason: impl Into<String>) -> Self {
        Self {
            candidates: Vec::new(),
            status: ResultStatus::Degraded {
                reason: reason.into(),
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ResultStatus::Degraded { .. })
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cosine::cosine_similarity;
use crate::error::VecError;
use crate::filter::Filter;

/// Free-form record metadata, returned verbatim with each match.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A vector to be stored under `id` within a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Match is a single result from a vector similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,

    /// Similarity to the query. Higher means more similar; callers should
    /// assume nothing else about the metric.
    pub score: f32,

    pub metadata: Metadata,
}

/// VecIndex is the interface for namespaced nearest-neighbor search over
/// dense float32 vectors.
///
/// All implementations must be safe for concurrent use (Send + Sync).
#[async_trait]
pub trait VecIndex: Send + Sync {
    /// Add or replace records in `namespace`. Returns the number written.
    async fn upsert(&self, records: Vec<VectorRecord>, namespace: &str) -> Result<usize, VecError>;

    /// Return at most `top_k` records of `namespace` passing `filter`,
    /// ordered by descending score.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        namespace: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<Match>, VecError>;

    /// Remove records by id. Missing ids are not an error. Returns the number
    /// actually removed.
    async fn delete(&self, ids: &[String], namespace: &str) -> Result<usize, VecError>;

    /// Number of records in `namespace`.
    async fn len(&self, namespace: &str) -> Result<usize, VecError>;
}

/// Brute-force scoring shared by the bundled indexes. Ties order by id so
/// results are reproducible.
pub(crate) fn rank<'a>(
    records: impl Iterator<Item = &'a VectorRecord>,
    embedding: &[f32],
    top_k: usize,
    filter: Option<&Filter>,
) -> Vec<Match> {
    if top_k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &VectorRecord)> = records
        .filter(|r| filter.is_none_or(|f| f.matches(&r.metadata)))
        .map(|r| (cosine_similarity(embedding, &r.embedding), r))
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(score, r)| Match {
            id: r.id.clone(),
            score,
            metadata: r.metadata.clone(),
        })
        .collect()
}

pub(crate) fn check_dimension(expected: Option<usize>, got: usize) -> Result<(), VecError> {
    match expected {
        Some(want) if want != got => Err(VecError::DimensionMismatch { got, want }),
        _ => Ok(()),
    }
}

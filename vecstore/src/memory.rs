use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::VecError;
use crate::filter::Filter;
use crate::vecstore::{Match, VecIndex, VectorRecord, check_dimension, rank};

/// In-memory VecIndex using brute-force cosine similarity.
/// Intended for tests and small corpora.
#[derive(Default)]
pub struct MemoryIndex {
    dimension: Option<usize>,
    namespaces: RwLock<HashMap<String, HashMap<String, VectorRecord>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject records and queries whose length is not `dimension`.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::default()
        }
    }
}

#[async_trait]
impl VecIndex for MemoryIndex {
    async fn upsert(&self, records: Vec<VectorRecord>, namespace: &str) -> Result<usize, VecError> {
        for r in &records {
            check_dimension(self.dimension, r.embedding.len())?;
        }
        let n = records.len();
        let mut namespaces = self.namespaces.write();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        for r in records {
            ns.insert(r.id.clone(), r);
        }
        Ok(n)
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        namespace: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<Match>, VecError> {
        check_dimension(self.dimension, embedding.len())?;
        let namespaces = self.namespaces.read();
        Ok(match namespaces.get(namespace) {
            Some(ns) => rank(ns.values(), embedding, top_k, filter),
            None => Vec::new(),
        })
    }

    async fn delete(&self, ids: &[String], namespace: &str) -> Result<usize, VecError> {
        let mut namespaces = self.namespaces.write();
        let Some(ns) = namespaces.get_mut(namespace) else {
            return Ok(0);
        };
        Ok(ids.iter().filter(|id| ns.remove(id.as_str()).is_some()).count())
    }

    async fn len(&self, namespace: &str) -> Result<usize, VecError> {
        Ok(self.namespaces.read().get(namespace).map_or(0, HashMap::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, v: &[f32]) -> VectorRecord {
        VectorRecord::new(id, v.to_vec())
    }

    #[tokio::test]
    async fn test_upsert_and_query() {
        let idx = MemoryIndex::new();
        idx.upsert(
            vec![
                record("a", &[1.0, 0.0, 0.0, 0.0]),
                record("b", &[0.0, 1.0, 0.0, 0.0]),
                record("c", &[0.9, 0.1, 0.0, 0.0]),
            ],
            "prod",
        )
        .await
        .unwrap();

        let matches = idx.query(&[1.0, 0.0, 0.0, 0.0], 2, "prod", None).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "a");
        assert_eq!(matches[1].id, "c");
        assert!(matches[0].score >= matches[1].score);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let idx = MemoryIndex::new();
        idx.upsert(vec![record("a", &[1.0, 0.0])], "prod").await.unwrap();
        idx.upsert(vec![record("b", &[1.0, 0.0])], "staging").await.unwrap();

        let prod = idx.query(&[1.0, 0.0], 10, "prod", None).await.unwrap();
        assert_eq!(prod.len(), 1);
        assert_eq!(prod[0].id, "a");
        assert!(idx.query(&[1.0, 0.0], 10, "nope", None).await.unwrap().is_empty());
        assert_eq!(idx.len("staging").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let idx = MemoryIndex::new();
        idx.upsert(vec![record("a", &[1.0, 0.0])], "ns").await.unwrap();
        idx.upsert(vec![record("a", &[0.0, 1.0])], "ns").await.unwrap();
        assert_eq!(idx.len("ns").await.unwrap(), 1);

        let m = idx.query(&[0.0, 1.0], 1, "ns", None).await.unwrap();
        assert!((m[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_filter_and_metadata() {
        let idx = MemoryIndex::new();
        let meta = |p: &str| match json!({ "platform": p }) {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        };
        idx.upsert(
            vec![
                record("a", &[1.0, 0.0]).with_metadata(meta("youtube")),
                record("b", &[0.9, 0.1]).with_metadata(meta("tiktok")),
            ],
            "ns",
        )
        .await
        .unwrap();

        let f = Filter::eq("platform", "tiktok");
        let m = idx.query(&[1.0, 0.0], 10, "ns", Some(&f)).await.unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].id, "b");
        assert_eq!(m[0].metadata["platform"], "tiktok");
    }

    #[tokio::test]
    async fn test_dimension_enforced() {
        let idx = MemoryIndex::with_dimension(3);
        let err = idx.upsert(vec![record("a", &[1.0, 0.0])], "ns").await.unwrap_err();
        assert!(matches!(err, VecError::DimensionMismatch { got: 2, want: 3 }));
        assert_eq!(idx.len("ns").await.unwrap(), 0);
        assert!(idx.query(&[1.0], 1, "ns", None).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_empty() {
        let idx = MemoryIndex::new();
        assert!(idx.query(&[1.0], 5, "ns", None).await.unwrap().is_empty());
        idx.upsert(vec![record("a", &[1.0])], "ns").await.unwrap();
        let removed = idx
            .delete(&["a".to_string(), "missing".to_string()], "ns")
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(idx.len("ns").await.unwrap(), 0);
        assert!(idx.query(&[1.0], 0, "ns", None).await.unwrap().is_empty());
    }
}

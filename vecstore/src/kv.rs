use std::sync::Arc;

use async_trait::async_trait;
use increator_kv::{KVStore, WriteBatch};
use tracing::debug;

use crate::error::VecError;
use crate::filter::Filter;
use crate::vecstore::{Match, VecIndex, VectorRecord, check_dimension, rank};

const SEP: char = '\x1F';

/// Brute-force VecIndex over records persisted in a [`KVStore`].
///
/// Key layout:
///
/// ```text
/// vec:{namespace}\x1F{id} -> msgpack VectorRecord
/// ```
///
/// Every query scans the namespace, so this suits corpora that fit
/// comfortably in memory.
pub struct KvIndex {
    store: Arc<dyn KVStore>,
    dimension: Option<usize>,
}

impl KvIndex {
    pub fn new(store: Arc<dyn KVStore>) -> Self {
        Self {
            store,
            dimension: None,
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    fn load(&self, namespace: &str) -> Result<Vec<VectorRecord>, VecError> {
        self.store
            .scan(&prefix(namespace)?)?
            .iter()
            .map(|(_, v)| {
                rmp_serde::from_slice(v).map_err(|e| VecError::Serialization(e.to_string()))
            })
            .collect()
    }
}

fn prefix(namespace: &str) -> Result<String, VecError> {
    if namespace.is_empty() || namespace.contains(SEP) {
        return Err(VecError::InvalidRecord(format!("bad namespace {namespace:?}")));
    }
    Ok(format!("vec:{namespace}{SEP}"))
}

fn record_key(namespace: &str, id: &str) -> Result<String, VecError> {
    if id.is_empty() || id.contains(SEP) {
        return Err(VecError::InvalidRecord(format!("bad id {id:?}")));
    }
    Ok(format!("{}{id}", prefix(namespace)?))
}

#[async_trait]
impl VecIndex for KvIndex {
    async fn upsert(&self, records: Vec<VectorRecord>, namespace: &str) -> Result<usize, VecError> {
        let mut batch = WriteBatch::new();
        for r in &records {
            check_dimension(self.dimension, r.embedding.len())?;
            let data =
                rmp_serde::to_vec_named(r).map_err(|e| VecError::Serialization(e.to_string()))?;
            batch.put(record_key(namespace, &r.id)?, data);
        }
        self.store.write(&batch)?;
        debug!(namespace, count = records.len(), "vecstore: upserted");
        Ok(records.len())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        namespace: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<Match>, VecError> {
        check_dimension(self.dimension, embedding.len())?;
        let records = self.load(namespace)?;
        Ok(rank(records.iter(), embedding, top_k, filter))
    }

    async fn delete(&self, ids: &[String], namespace: &str) -> Result<usize, VecError> {
        let mut batch = WriteBatch::new();
        for id in ids {
            let key = record_key(namespace, id)?;
            if self.store.contains(&key)? {
                batch.delete(key);
            }
        }
        self.store.write(&batch)?;
        Ok(batch.len())
    }

    async fn len(&self, namespace: &str) -> Result<usize, VecError> {
        Ok(self.store.scan(&prefix(namespace)?)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use increator_kv::{MemoryStore, RedbStore};

    #[tokio::test]
    async fn test_query_orders_by_score() {
        let idx = KvIndex::new(Arc::new(MemoryStore::new()));
        idx.upsert(
            vec![
                VectorRecord::new("far", vec![0.0, 1.0]),
                VectorRecord::new("near", vec![1.0, 0.1]),
                VectorRecord::new("exact", vec![1.0, 0.0]),
            ],
            "prod",
        )
        .await
        .unwrap();

        let ids: Vec<String> = idx
            .query(&[1.0, 0.0], 10, "prod", None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["exact", "near", "far"]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vec.redb");
        {
            let idx = KvIndex::new(Arc::new(RedbStore::open(&path).unwrap()));
            idx.upsert(vec![VectorRecord::new("a", vec![1.0, 0.0])], "prod")
                .await
                .unwrap();
        }
        let idx = KvIndex::new(Arc::new(RedbStore::open(&path).unwrap()));
        assert_eq!(idx.len("prod").await.unwrap(), 1);
        assert_eq!(idx.query(&[1.0, 0.0], 1, "prod", None).await.unwrap()[0].id, "a");
    }

    #[tokio::test]
    async fn test_namespace_prefixes_do_not_overlap() {
        let idx = KvIndex::new(Arc::new(MemoryStore::new()));
        idx.upsert(vec![VectorRecord::new("a", vec![1.0])], "prod").await.unwrap();
        idx.upsert(vec![VectorRecord::new("b", vec![1.0])], "prod2").await.unwrap();
        assert_eq!(idx.len("prod").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_counts_existing_only() {
        let idx = KvIndex::new(Arc::new(MemoryStore::new()));
        idx.upsert(vec![VectorRecord::new("a", vec![1.0])], "ns").await.unwrap();
        let n = idx
            .delete(&["a".into(), "zzz".into()], "ns")
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(idx.len("ns").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejects_bad_ids() {
        let idx = KvIndex::new(Arc::new(MemoryStore::new())).with_dimension(1);
        assert!(idx.upsert(vec![VectorRecord::new("", vec![1.0])], "ns").await.is_err());
        assert!(idx.upsert(vec![VectorRecord::new("a", vec![1.0])], "").await.is_err());
        assert!(matches!(
            idx.upsert(vec![VectorRecord::new("a", vec![1.0, 2.0])], "ns").await,
            Err(VecError::DimensionMismatch { .. })
        ));
    }
}

use std::sync::Arc;

use increator_kv::{KVStore, WriteBatch};

use crate::error::{IdentityError, Result};
use crate::keys::{
    edge_by_key, edge_by_prefix, edge_conf_key, edge_conf_prefix, edge_key, edge_prefix,
    parse_edge_conf_key, score_bp,
};
use crate::types::{IdentityEdge, ProfileId};

/// The `identity_edges` collection.
///
/// Append-only from the clustering path and deduplicated on the unordered
/// endpoint pair. Each edge is indexed by both endpoints and by confidence.
pub struct EdgeStore {
    store: Arc<dyn KVStore>,
}

impl EdgeStore {
    pub fn new(store: Arc<dyn KVStore>) -> Self {
        Self { store }
    }

    /// Persist `edge` unless its pair already has one. Returns whether a new
    /// edge was written.
    pub fn put(&self, edge: &IdentityEdge) -> Result<bool> {
        let mut batch = WriteBatch::new();
        if !self.stage_put(edge, &mut batch)? {
            return Ok(false);
        }
        let key = edge_key(&edge.source_id, &edge.target_id);
        self.store
            .write(&batch)
            .map_err(|e| IdentityError::storage("put edge", key, e))?;
        Ok(true)
    }

    /// Stage the writes for a new edge into `batch`. Returns false, staging
    /// nothing, if the pair already has an edge.
    pub(crate) fn stage_put(&self, edge: &IdentityEdge, batch: &mut WriteBatch) -> Result<bool> {
        let (a, b) = (&edge.source_id, &edge.target_id);
        if a == b {
            return Err(IdentityError::Validation(format!("self edge on {a}")));
        }
        if self.get(a, b)?.is_some() {
            return Ok(false);
        }
        let data = rmp_serde::to_vec_named(edge)
            .map_err(|e| IdentityError::Serialization(e.to_string()))?;
        batch
            .put(edge_key(a, b), data)
            .put(edge_by_key(a, b), Vec::new())
            .put(edge_by_key(b, a), Vec::new())
            .put(edge_conf_key(edge.confidence_score, a, b), Vec::new());
        Ok(true)
    }

    /// Stage the removal of the edge between `a` and `b`. Returns the removed
    /// edge, or `None` if there was none.
    pub(crate) fn stage_remove(
        &self,
        a: &ProfileId,
        b: &ProfileId,
        batch: &mut WriteBatch,
    ) -> Result<Option<IdentityEdge>> {
        let Some(edge) = self.get(a, b)? else {
            return Ok(None);
        };
        batch
            .delete(edge_key(a, b))
            .delete(edge_by_key(a, b))
            .delete(edge_by_key(b, a))
            .delete(edge_conf_key(edge.confidence_score, a, b));
        Ok(Some(edge))
    }

    /// Remove the edge between `a` and `b`, if any.
    pub fn remove(&self, a: &ProfileId, b: &ProfileId) -> Result<Option<IdentityEdge>> {
        let mut batch = WriteBatch::new();
        let removed = self.stage_remove(a, b, &mut batch)?;
        if removed.is_some() {
            self.store
                .write(&batch)
                .map_err(|e| IdentityError::storage("remove edge", edge_key(a, b), e))?;
        }
        Ok(removed)
    }

    /// The edge between `a` and `b` in either direction.
    pub fn get(&self, a: &ProfileId, b: &ProfileId) -> Result<Option<IdentityEdge>> {
        let key = edge_key(a, b);
        match self
            .store
            .get(&key)
            .map_err(|e| IdentityError::storage("get edge", key.as_str(), e))?
        {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    /// All edges touching `id`.
    pub fn edges_of(&self, id: &ProfileId) -> Result<Vec<IdentityEdge>> {
        let prefix = edge_by_prefix(id);
        let entries = self
            .store
            .scan(&prefix)
            .map_err(|e| IdentityError::storage("scan", prefix.as_str(), e))?;

        let mut out = Vec::with_capacity(entries.len());
        for (key, _) in entries {
            let Some(other) = key.strip_prefix(&prefix) else {
                continue;
            };
            if let Some(edge) = self.get(id, &ProfileId::from(other))? {
                out.push(edge);
            }
        }
        Ok(out)
    }

    /// Edges whose confidence lies in `[min, max]`, ascending by confidence.
    pub fn by_confidence(&self, min: f64, max: f64) -> Result<Vec<IdentityEdge>> {
        let (lo_bp, hi_bp) = (score_bp(min), score_bp(max));
        let entries = self
            .store
            .scan(edge_conf_prefix())
            .map_err(|e| IdentityError::storage("scan", edge_conf_prefix(), e))?;

        let mut out = Vec::new();
        for (key, _) in entries {
            let Some((bp, lo, hi)) = parse_edge_conf_key(&key) else {
                continue;
            };
            if bp < lo_bp {
                continue;
            }
            if bp > hi_bp {
                break;
            }
            if let Some(edge) = self.get(&lo, &hi)? {
                out.push(edge);
            }
        }
        Ok(out)
    }

    /// Every stored edge, ordered by endpoint pair.
    pub fn all(&self) -> Result<Vec<IdentityEdge>> {
        let entries = self
            .store
            .scan(edge_prefix())
            .map_err(|e| IdentityError::storage("scan", edge_prefix(), e))?;
        entries.iter().map(|(_, v)| decode(v)).collect()
    }
}

fn decode(data: &[u8]) -> Result<IdentityEdge> {
    rmp_serde::from_slice(data).map_err(|e| IdentityError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchDecision, MatchReason, MatchType};
    use increator_kv::MemoryStore;

    fn edge(a: &str, b: &str, score: f64) -> IdentityEdge {
        let decision = MatchDecision {
            matched: true,
            match_type: MatchType::Probabilistic,
            score,
            reason: MatchReason::HighConfidenceSignals,
        };
        IdentityEdge::new(&ProfileId::from(a), &ProfileId::from(b), &decision)
    }

    #[test]
    fn test_put_deduplicates_unordered_pair() {
        let store = EdgeStore::new(Arc::new(MemoryStore::new()));
        assert!(store.put(&edge("a", "b", 0.9)).unwrap());
        assert!(!store.put(&edge("a", "b", 0.9)).unwrap());
        assert!(!store.put(&edge("b", "a", 0.95)).unwrap());
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[test]
    fn test_edges_of_both_directions() {
        let store = EdgeStore::new(Arc::new(MemoryStore::new()));
        store.put(&edge("a", "b", 0.9)).unwrap();
        store.put(&edge("c", "a", 1.0)).unwrap();
        store.put(&edge("b", "c", 0.88)).unwrap();

        let of_a = store.edges_of(&ProfileId::from("a")).unwrap();
        assert_eq!(of_a.len(), 2);
        assert!(of_a.iter().any(|e| e.connects(&"a".into(), &"b".into())));
        assert!(of_a.iter().any(|e| e.connects(&"a".into(), &"c".into())));
    }

    #[test]
    fn test_by_confidence_range() {
        let store = EdgeStore::new(Arc::new(MemoryStore::new()));
        store.put(&edge("a", "b", 0.86)).unwrap();
        store.put(&edge("c", "d", 0.93)).unwrap();
        store.put(&edge("e", "f", 1.0)).unwrap();

        let mid = store.by_confidence(0.9, 0.99).unwrap();
        assert_eq!(mid.len(), 1);
        assert_eq!(mid[0].confidence_score, 0.93);

        let scores: Vec<f64> = store
            .by_confidence(0.0, 1.0)
            .unwrap()
            .iter()
            .map(|e| e.confidence_score)
            .collect();
        assert_eq!(scores, vec![0.86, 0.93, 1.0]);
    }

    #[test]
    fn test_remove_clears_indexes() {
        let kv = MemoryStore::new();
        let store = EdgeStore::new(Arc::new(kv.clone()));
        store.put(&edge("a", "b", 0.9)).unwrap();

        let removed = store.remove(&"b".into(), &"a".into()).unwrap();
        assert!(removed.is_some());
        assert!(kv.is_empty());
        assert!(store.remove(&"a".into(), &"b".into()).unwrap().is_none());
    }

    #[test]
    fn test_self_edge_rejected() {
        let store = EdgeStore::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            store.put(&edge("a", "a", 1.0)),
            Err(IdentityError::Validation(_))
        ));
    }
}

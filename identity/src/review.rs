use std::sync::Arc;

use chrono::Utc;
use increator_kv::{KVStore, WriteBatch};

use crate::error::{IdentityError, Result};
use crate::keys::{dismissed_key, suggest_key, suggest_prefix};
use crate::types::{ProfileId, Suggestion};

/// Borderline pairs waiting for a human decision. Queued pairs never affect
/// clustering until confirmed.
pub struct ReviewQueue {
    store: Arc<dyn KVStore>,
}

impl ReviewQueue {
    pub fn new(store: Arc<dyn KVStore>) -> Self {
        Self { store }
    }

    /// Queue a pair, replacing any earlier entry for the same pair.
    pub fn enqueue(&self, a: &ProfileId, b: &ProfileId, score: f64) -> Result<Suggestion> {
        let suggestion = Suggestion {
            a: a.clone(),
            b: b.clone(),
            score,
            queued_at: Utc::now(),
        };
        let key = suggest_key(a, b);
        let data = rmp_serde::to_vec_named(&suggestion)
            .map_err(|e| IdentityError::Serialization(e.to_string()))?;
        self.store
            .set(&key, &data)
            .map_err(|e| IdentityError::storage("queue suggestion", key, e))?;
        Ok(suggestion)
    }

    pub fn get(&self, a: &ProfileId, b: &ProfileId) -> Result<Option<Suggestion>> {
        let key = suggest_key(a, b);
        match self
            .store
            .get(&key)
            .map_err(|e| IdentityError::storage("get suggestion", key.as_str(), e))?
        {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Stage removal of a queued pair and return it, if present.
    pub(crate) fn stage_take(
        &self,
        a: &ProfileId,
        b: &ProfileId,
        batch: &mut WriteBatch,
    ) -> Result<Option<Suggestion>> {
        let found = self.get(a, b)?;
        if found.is_some() {
            batch.delete(suggest_key(a, b));
        }
        Ok(found)
    }

    /// Drop a queued pair without merging and remember the rejection, so
    /// the pair is not queued again. Returns whether it was queued.
    pub fn dismiss(&self, a: &ProfileId, b: &ProfileId) -> Result<bool> {
        let mut batch = WriteBatch::new();
        if self.stage_take(a, b, &mut batch)?.is_none() {
            return Ok(false);
        }
        batch.put(dismissed_key(a, b), Vec::new());
        self.store
            .write(&batch)
            .map_err(|e| IdentityError::storage("dismiss suggestion", suggest_key(a, b), e))?;
        Ok(true)
    }

    /// True if a reviewer dismissed this pair.
    pub fn is_dismissed(&self, a: &ProfileId, b: &ProfileId) -> Result<bool> {
        let key = dismissed_key(a, b);
        self.store
            .contains(&key)
            .map_err(|e| IdentityError::storage("get dismissal", key, e))
    }

    /// Every queued pair, ordered by pair key.
    pub fn pending(&self) -> Result<Vec<Suggestion>> {
        let entries = self
            .store
            .scan(suggest_prefix())
            .map_err(|e| IdentityError::storage("scan", suggest_prefix(), e))?;
        entries.iter().map(|(_, v)| decode(v)).collect()
    }
}

fn decode(data: &[u8]) -> Result<Suggestion> {
    rmp_serde::from_slice(data).map_err(|e| IdentityError::Serialization(e.to_string()))
}

//! In-memory key-value store for tests and one-shot runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{KVResult, KVStore, WriteBatch, WriteOp};

/// An in-memory store backed by an ordered map.
///
/// Clones share the same underlying data, so a test can hand one handle to
/// the component under test and keep another to inspect or reopen it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KVStore for MemoryStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn write(&self, batch: &WriteBatch) -> KVResult<()> {
        let mut data = self.data.write();
        for op in batch.ops() {
            match op {
                WriteOp::Put { key, value } => {
                    data.insert(key.clone(), value.clone());
                }
                WriteOp::Delete { key } => {
                    data.remove(key);
                }
            }
        }
        Ok(())
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        let data = self.data.read();
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

//! Key-value persistence boundary.
//!
//! The identity collections (`creators`, `identity_edges`, the union-find
//! checkpoint and the review queue) and the persisted vector index are all
//! laid out as prefixed keys over a single [`KVStore`]. [`MemoryStore`] backs
//! tests and one-shot runs, [`RedbStore`] backs the on-disk store used by the
//! CLI.

pub mod memory;
pub mod redb;

use std::fmt;
use thiserror::Error;

/// Errors raised by a KV backend.
#[derive(Error, Debug)]
pub enum KVError {
    #[error("kv: {op} failed: {cause}")]
    Backend { op: &'static str, cause: String },
}

impl KVError {
    pub(crate) fn backend(op: &'static str, cause: impl fmt::Display) -> Self {
        KVError::Backend {
            op,
            cause: cause.to_string(),
        }
    }
}

/// Result type for KV operations.
pub type KVResult<T> = Result<T, KVError>;

/// A single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

/// An ordered set of mutations applied atomically by [`KVStore::write`].
///
/// Later operations on the same key win.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete { key: key.into() });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }
}

/// Key-value store with string keys and byte values.
///
/// Implementations must be safe for concurrent use and must return
/// [`KVStore::scan`] results in ascending key order.
pub trait KVStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>>;

    /// Apply every operation in `batch` atomically: either all are visible
    /// afterwards or none are.
    fn write(&self, batch: &WriteBatch) -> KVResult<()>;

    /// Return all entries whose key starts with `prefix`, ascending by key.
    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>>;

    /// Set a single key.
    fn set(&self, key: &str, value: &[u8]) -> KVResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write(&batch)
    }

    /// Delete a single key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> KVResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.write(&batch)
    }

    /// Return true if `key` is present.
    fn contains(&self, key: &str) -> KVResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl fmt::Debug for dyn KVStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KVStore {{ ... }}")
    }
}

pub use self::memory::MemoryStore;
pub use self::redb::RedbStore;

//! Redb-backed persistent key-value store.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use crate::{KVError, KVResult, KVStore, WriteBatch, WriteOp};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("increator");

/// A persistent store backed by a single redb table.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> KVResult<Self> {
        let db = Database::create(path).map_err(|e| KVError::backend("open", e))?;

        let tx = db.begin_write().map_err(|e| KVError::backend("open", e))?;
        tx.open_table(TABLE)
            .map_err(|e| KVError::backend("open", e))?;
        tx.commit().map_err(|e| KVError::backend("open", e))?;

        Ok(Self { db })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let tx = self.db.begin_read().map_err(|e| KVError::backend("get", e))?;
        let table = tx
            .open_table(TABLE)
            .map_err(|e| KVError::backend("get", e))?;
        let value = table.get(key).map_err(|e| KVError::backend("get", e))?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn write(&self, batch: &WriteBatch) -> KVResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let tx = self
            .db
            .begin_write()
            .map_err(|e| KVError::backend("write", e))?;
        {
            let mut table = tx
                .open_table(TABLE)
                .map_err(|e| KVError::backend("write", e))?;
            for op in batch.ops() {
                match op {
                    WriteOp::Put { key, value } => {
                        table
                            .insert(key.as_str(), value.as_slice())
                            .map_err(|e| KVError::backend("write", e))?;
                    }
                    WriteOp::Delete { key } => {
                        table
                            .remove(key.as_str())
                            .map_err(|e| KVError::backend("write", e))?;
                    }
                }
            }
        }
        tx.commit().map_err(|e| KVError::backend("write", e))
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        let tx = self.db.begin_read().map_err(|e| KVError::backend("scan", e))?;
        let table = tx
            .open_table(TABLE)
            .map_err(|e| KVError::backend("scan", e))?;

        let mut results = Vec::new();
        for item in table
            .range(prefix..)
            .map_err(|e| KVError::backend("scan", e))?
        {
            let (key, value) = item.map_err(|e| KVError::backend("scan", e))?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_string(), value.value().to_vec()));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            let mut batch = WriteBatch::new();
            batch.put("idn:uf:a", b"root".to_vec()).put("idn:uf:b", b"a".to_vec());
            store.write(&batch).unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get("idn:uf:a").unwrap(), Some(b"root".to_vec()));
        assert_eq!(store.get("idn:uf:b").unwrap(), Some(b"a".to_vec()));
    }

    #[test]
    fn test_scan_stops_at_prefix_boundary() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path().join("scan.redb")).unwrap();
        store.set("idn:edge:a", b"1").unwrap();
        store.set("idn:edge:b", b"2").unwrap();
        store.set("idn:edge_by:a", b"").unwrap();
        store.set("idn:creator:x", b"3").unwrap();

        let keys: Vec<String> = store
            .scan("idn:edge:")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["idn:edge:a", "idn:edge:b"]);
    }

    #[test]
    fn test_delete_in_batch() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path().join("del.redb")).unwrap();
        store.set("k", b"v").unwrap();

        let mut batch = WriteBatch::new();
        batch.delete("k").delete("never-existed");
        store.write(&batch).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}

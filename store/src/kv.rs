//! Flat byte-oriented KV backends. The in-memory backend serves tests;
//! the redb backend gives durable single-file storage with transactional
//! batch writes, which `BiometricStore` relies on for atomic enrollment
//! persistence.

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("voxauth");

/// Byte-level key-value backend.
pub trait Kv: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All entries whose key starts with `prefix`, sorted by key.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Write all entries in one transaction: either every entry lands
    /// or none do.
    fn batch_set(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError>;
}

/// In-memory backend. A BTreeMap keeps scans ordered for free.
#[derive(Default)]
pub struct MemoryKv {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Kv for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.data.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.data.lock().remove(key);
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Ok(self
            .data
            .lock()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn batch_set(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError> {
        let mut data = self.data.lock();
        for (k, v) in entries {
            data.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}

/// Durable backend on a single redb file.
pub struct RedbKv {
    db: Database,
}

impl RedbKv {
    /// Open or create a database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(|e| StoreError::Backend(e.to_string()))?;

        // Ensure the table exists so first reads do not fail.
        let tx = db
            .begin_write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        {
            tx.open_table(TABLE)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        tx.commit().map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { db })
    }
}

impl Kv for RedbKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let tx = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = tx
            .open_table(TABLE)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(table
            .get(key)
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .map(|v| v.value().to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.batch_set(std::slice::from_ref(&(key.to_string(), value.to_vec())))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let tx = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        {
            let mut table = tx
                .open_table(TABLE)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        tx.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let tx = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = tx
            .open_table(TABLE)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut results = Vec::new();
        for item in table
            .range(prefix..)
            .map_err(|e| StoreError::Backend(e.to_string()))?
        {
            let (key, value) = item.map_err(|e| StoreError::Backend(e.to_string()))?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_string(), value.value().to_vec()));
        }
        Ok(results)
    }

    fn batch_set(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError> {
        let tx = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        {
            let mut table = tx
                .open_table(TABLE)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            for (key, value) in entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
            }
        }
        tx.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

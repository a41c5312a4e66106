//! Storage trait and implementations
//!
//! Both backends iterate in first-insertion order; overwriting a key keeps
//! its original position.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

pub trait Storage: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    fn delete(&self, key: &[u8]) -> Result<()>;
    /// All entries in native iteration order.
    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
    /// Atomically bumps the big-endian u64 counter stored at `key` and
    /// returns the value it held before (0 for a fresh counter).
    fn increment(&self, key: &[u8]) -> Result<u64>;
}

#[derive(Clone, Default)]
struct Entries {
    order: Vec<Vec<u8>>,
    values: HashMap<Vec<u8>, Vec<u8>>,
}

impl Entries {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &[u8], value: &[u8]) {
        if self.values.insert(key.to_vec(), value.to_vec()).is_none() {
            self.order.push(key.to_vec());
        }
    }

    fn delete(&mut self, key: &[u8]) {
        if self.values.remove(key).is_some() {
            self.order.retain(|k| k.as_slice() != key);
        }
    }

    fn scan(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.order
            .iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    fn increment(&mut self, key: &[u8]) -> Result<u64> {
        let current = match self.values.get(key) {
            Some(bytes) => decode_counter(key, bytes)?,
            None => 0,
        };
        self.put(key, &(current + 1).to_be_bytes());
        Ok(current)
    }
}

fn decode_counter(key: &[u8], bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        LedgerError::Serialization(format!(
            "counter {} does not hold 8 bytes",
            String::from_utf8_lossy(key)
        ))
    })?;
    Ok(u64::from_be_bytes(raw))
}

fn poisoned<T>(_: T) -> LedgerError {
    LedgerError::Storage("storage lock poisoned".into())
}

/// In-memory storage (for testing and demos). Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    data: Arc<RwLock<Entries>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().map_err(poisoned)?.get(key))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.write().map_err(poisoned)?.put(key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().map_err(poisoned)?.delete(key);
        Ok(())
    }

    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.data.read().map_err(poisoned)?.scan())
    }

    fn increment(&self, key: &[u8]) -> Result<u64> {
        self.data.write().map_err(poisoned)?.increment(key)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    #[serde(with = "hex")]
    key: Vec<u8>,
    #[serde(with = "hex")]
    value: Vec<u8>,
}

/// JSON-file storage. The whole file is rewritten (tmp + rename) after
/// every mutation while the write lock is held.
#[derive(Clone)]
pub struct FileBackedStorage {
    path: PathBuf,
    data: Arc<RwLock<Entries>>,
}

impl FileBackedStorage {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries = Entries::default();

        if path.exists() {
            let bytes = std::fs::read(&path).map_err(|e| LedgerError::Storage(e.to_string()))?;
            let stored: Vec<StoredEntry> = serde_json::from_slice(&bytes)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?;
            for e in stored {
                entries.put(&e.key, &e.value);
            }
            tracing::debug!(path = %path.display(), entries = entries.order.len(), "ledger storage loaded");
        }

        Ok(Self { path, data: Arc::new(RwLock::new(entries)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &Entries) -> Result<()> {
        let stored: Vec<StoredEntry> = entries
            .scan()
            .into_iter()
            .map(|(key, value)| StoredEntry { key, value })
            .collect();
        let bytes = serde_json::to_vec(&stored).map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, &bytes).map_err(|e| LedgerError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| LedgerError::Storage(e.to_string()))?;
        Ok(())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Entries) -> Result<R>) -> Result<R> {
        let mut guard = self.data.write().map_err(poisoned)?;
        // Work on a copy so a failed write leaves memory and disk in agreement.
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }
}

impl Storage for FileBackedStorage {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().map_err(poisoned)?.get(key))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.mutate(|e| {
            e.put(key, value);
            Ok(())
        })
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.mutate(|e| {
            e.delete(key);
            Ok(())
        })
    }

    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.data.read().map_err(poisoned)?.scan())
    }

    fn increment(&self, key: &[u8]) -> Result<u64> {
        self.mutate(|e| e.increment(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_keeps_position() {
        let s = InMemoryStorage::new();
        s.put(b"a", b"1").unwrap();
        s.put(b"b", b"2").unwrap();
        s.put(b"a", b"3").unwrap();

        let keys: Vec<_> = s.scan().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(s.get(b"a").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn delete_drops_from_scan() {
        let s = InMemoryStorage::new();
        s.put(b"a", b"1").unwrap();
        s.put(b"b", b"2").unwrap();
        s.delete(b"a").unwrap();

        assert_eq!(s.scan().unwrap(), vec![(b"b".to_vec(), b"2".to_vec())]);
    }

    #[test]
    fn increment_returns_previous_value() {
        let s = InMemoryStorage::new();
        assert_eq!(s.increment(b"c").unwrap(), 0);
        assert_eq!(s.increment(b"c").unwrap(), 1);
        assert_eq!(s.get(b"c").unwrap(), Some(2u64.to_be_bytes().to_vec()));
    }

    #[test]
    fn increment_rejects_foreign_value() {
        let s = InMemoryStorage::new();
        s.put(b"c", b"not a counter").unwrap();
        assert!(matches!(s.increment(b"c"), Err(LedgerError::Serialization(_))));
    }
}

//! Ledger state store
//!
//! Key-value and document store backing the validation chaincode. Every
//! mutation is appended to a signed, hash-chained write log; documents can
//! be queried with equality selectors; named counters give durable,
//! atomically assigned sequence numbers.

mod crypto;
mod events;
mod selector;
mod storage;
mod types;

pub use events::{LogEntry, Operation, WriteEvent};
pub use selector::Selector;
pub use storage::{FileBackedStorage, InMemoryStorage, Storage};
pub use types::{Checkpoint, Hash32, WriteReceipt};

pub use ed25519_dalek::{SigningKey, VerifyingKey};

use ed25519_dalek::Signer as _;
use events::EventLog;
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Key already holds a value: {0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

const COUNTER_PREFIX: &str = "counter:";

/// Ledger over a pluggable storage backend
pub struct Ledger<S: Storage> {
    storage: S,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    event_log: EventLog,
}

impl<S: Storage> Ledger<S> {
    /// Create a ledger with a fresh signing key
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, SigningKey::generate(&mut OsRng))
    }

    /// Create with a specific signing key (for testing/recovery)
    pub fn with_key(storage: S, signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            storage,
            signing_key,
            verifying_key,
            event_log: EventLog::new(),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.storage.get(key.as_bytes())
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Write `value` under `key`, replacing whatever was there.
    pub fn put(&mut self, key: &str, value: &[u8]) -> Result<WriteReceipt> {
        self.storage.put(key.as_bytes(), value)?;
        self.log(events::Operation::Put, key, crypto::hash_value(value))
    }

    /// Write `value` under `key` only if the key is vacant.
    pub fn put_unique(&mut self, key: &str, value: &[u8]) -> Result<WriteReceipt> {
        if self.contains(key)? {
            return Err(LedgerError::Conflict(key.to_string()));
        }
        self.put(key, value)
    }

    pub fn delete(&mut self, key: &str) -> Result<WriteReceipt> {
        self.storage.delete(key.as_bytes())?;
        self.log(events::Operation::Delete, key, crypto::empty_value_hash())
    }

    /// Records matching `selector`, in the store's native order. Values that
    /// are not JSON objects (counters, foreign blobs) never match.
    pub fn query(&self, selector: &Selector) -> Result<Vec<(String, Vec<u8>)>> {
        let mut out = Vec::new();
        for (key, value) in self.storage.scan()? {
            let Ok(doc) = serde_json::from_slice::<serde_json::Value>(&value) else { continue };
            if !selector.matches(&doc) {
                continue;
            }
            let key = String::from_utf8(key)
                .map_err(|e| LedgerError::Serialization(format!("non-utf8 key: {e}")))?;
            out.push((key, value));
        }
        Ok(out)
    }

    /// Next value of the named durable counter, starting at 0. The
    /// read-modify-write happens inside the storage backend.
    pub fn next_sequence(&mut self, name: &str) -> Result<u64> {
        let key = format!("{COUNTER_PREFIX}{name}");
        let issued = self.storage.increment(key.as_bytes())?;
        self.log(
            events::Operation::Increment,
            &key,
            crypto::hash_value(&(issued + 1).to_be_bytes()),
        )?;
        Ok(issued)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            height: self.event_log.height(),
            latest_event_hash: self.event_log.latest_hash(),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.verifying_key
    }

    // Verification helper for tests/clients
    pub fn verify_event_log(&self, vk: &VerifyingKey) -> bool {
        self.event_log.verify_chain_and_sigs(vk)
    }

    pub fn log_entries(&self) -> &[LogEntry] {
        &self.event_log.entries
    }

    #[doc(hidden)]
    pub fn tamper_last_signature_for_test(&mut self) {
        if let Some(last) = self.event_log.entries.last_mut() {
            if !last.signature.is_empty() {
                last.signature[0] ^= 0x01;
            }
        }
    }

    fn log(&mut self, operation: events::Operation, key: &str, value_hash: Hash32) -> Result<WriteReceipt> {
        let height = self.event_log.height() + 1;
        let event = events::WriteEvent {
            operation,
            key: key.to_string(),
            value_hash,
            prev_event_hash: self.event_log.latest_hash(),
            height,
            timestamp: now(),
        };

        let event_bytes = bincode::serialize(&event)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let event_hash = crypto::hash_event(&event_bytes);
        let signature = self.signing_key.sign(&event_bytes).to_bytes().to_vec();

        self.event_log.append(events::LogEntry {
            event_hash,
            event,
            signature: signature.clone(),
        });

        Ok(WriteReceipt {
            key: key.to_string(),
            value_hash,
            event_hash,
            height,
            signature,
        })
    }
}

fn now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

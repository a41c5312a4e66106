use crate::{crypto, Hash32};
use serde::{Deserialize, Serialize};
use ed25519_dalek::{Signature, VerifyingKey, Verifier as _};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Put,
    Delete,
    Increment,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteEvent {
    pub operation: Operation,
    pub key: String,
    pub value_hash: Hash32,
    pub prev_event_hash: Hash32,
    pub height: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub event_hash: Hash32,
    pub event: WriteEvent,
    pub signature: Vec<u8>, // signature over bincode(event)
}

#[derive(Default)]
pub struct EventLog {
    pub entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn height(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn latest_hash(&self) -> Hash32 {
        self.entries.last().map(|e| e.event_hash).unwrap_or([0u8; 32])
    }

    pub fn verify_chain_and_sigs(&self, vk: &VerifyingKey) -> bool {
        let mut prev = [0u8; 32];

        for (i, e) in self.entries.iter().enumerate() {
            // chain link
            if e.event.prev_event_hash != prev || e.event.height != i as u64 + 1 {
                return false;
            }

            // hash correctness
            let event_bytes = match bincode::serialize(&e.event) {
                Ok(b) => b,
                Err(_) => return false,
            };
            if crypto::hash_event(&event_bytes) != e.event_hash {
                return false;
            }

            // signature correctness
            let sig = match Signature::from_slice(e.signature.as_slice()) {
                Ok(s) => s,
                Err(_) => return false,
            };
            if vk.verify(&event_bytes, &sig).is_err() {
                return false;
            }

            prev = e.event_hash;
        }

        true
    }
}

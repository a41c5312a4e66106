//! Core types for the ledger

use serde::{Deserialize, Serialize};

/// 32-byte hash
pub type Hash32 = [u8; 32];

/// Receipt for a write operation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub key: String,
    pub value_hash: Hash32,
    pub event_hash: Hash32,
    pub height: u64,
    pub signature: Vec<u8>,
}

/// Position of the write log at a point in time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub height: u64,
    #[serde(with = "hex")]
    pub latest_event_hash: Hash32,
}

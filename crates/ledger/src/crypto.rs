//! Domain-separated hashing for the write log

use crate::Hash32;

const DOMAIN_VALUE: u8 = 0x00;
const DOMAIN_EVENT: u8 = 0x01;

/// value = H(0x00 || bytes)
pub fn hash_value(value: &[u8]) -> Hash32 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[DOMAIN_VALUE]);
    hasher.update(value);
    hasher.finalize().into()
}

/// event = H(0x01 || bincode(event))
pub fn hash_event(event_bytes: &[u8]) -> Hash32 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[DOMAIN_EVENT]);
    hasher.update(event_bytes);
    hasher.finalize().into()
}

/// Canonical hash recorded for deletes
pub fn empty_value_hash() -> Hash32 {
    [0u8; 32]
}

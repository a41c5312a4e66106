//! Typed access to ledger state.
//!
//! Records are JSON documents keyed by their identity; kinds are told
//! apart by `ObjectType`. Every call checks the request context first.

use ledger::{Checkpoint, Ledger, Selector, Storage};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{ChaincodeError, Keyed, RequestContext, Result};

/// `ObjectType == object_type`, optionally narrowed to one owner.
pub fn selector_for(object_type: &str, owner: Option<&str>) -> Selector {
    let s = Selector::new().eq("ObjectType", object_type);
    match owner {
        Some(o) => s.eq("Owner", o),
        None => s,
    }
}

pub struct StateFacade<S: Storage> {
    ledger: Ledger<S>,
}

impl<S: Storage> StateFacade<S> {
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn get_bytes(&self, ctx: &RequestContext, key: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        self.ledger
            .get(key)?
            .ok_or_else(|| ChaincodeError::NotFound(key.to_string()))
    }

    pub fn get_record<T: DeserializeOwned>(&self, ctx: &RequestContext, key: &str) -> Result<T> {
        let bytes = self.get_bytes(ctx, key)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ChaincodeError::Serialization(format!("record {key}: {e}")))
    }

    /// Writes a new record; an occupied key is `AlreadyExists`.
    pub fn insert_record<T: Serialize>(&mut self, ctx: &RequestContext, key: &str, record: &T) -> Result<()> {
        ctx.check()?;
        let bytes = serde_json::to_vec(record)?;
        self.ledger.put_unique(key, &bytes)?;
        Ok(())
    }

    /// Matching records in the store's native order.
    pub fn query<T: DeserializeOwned>(&self, ctx: &RequestContext, selector: &Selector) -> Result<Vec<Keyed<T>>> {
        ctx.check()?;
        self.ledger
            .query(selector)?
            .into_iter()
            .map(|(key, value)| {
                let record = serde_json::from_slice(&value)
                    .map_err(|e| ChaincodeError::Serialization(format!("record {key}: {e}")))?;
                Ok(Keyed { key, record })
            })
            .collect()
    }

    pub fn count(&self, ctx: &RequestContext, selector: &Selector) -> Result<u64> {
        ctx.check()?;
        Ok(self.ledger.query(selector)?.len() as u64)
    }

    pub fn next_sequence(&mut self, ctx: &RequestContext, name: &str) -> Result<u64> {
        ctx.check()?;
        Ok(self.ledger.next_sequence(name)?)
    }

    pub fn checkpoint(&self, ctx: &RequestContext) -> Result<Checkpoint> {
        ctx.check()?;
        Ok(self.ledger.checkpoint())
    }
}

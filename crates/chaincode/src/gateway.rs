//! Transaction submission: callers name an operation, pass string
//! arguments and get bytes back.

use std::sync::Arc;

use async_trait::async_trait;
use ledger::Storage;
use serde::de::DeserializeOwned;

use crate::codec::decode_u64;
use crate::oracle::ScoringOracle;
use crate::{ChaincodeError, Chaincode, RequestContext, Result};

#[async_trait]
pub trait Contract: Send + Sync {
    async fn submit(&self, ctx: &RequestContext, function: &str, args: &[String]) -> Result<Vec<u8>>;
}

/// In-process contract. Each ledger read or write is atomic; oracle calls
/// of concurrent transactions overlap.
pub struct LocalContract<S: Storage, O: ScoringOracle> {
    inner: Arc<Chaincode<S, O>>,
}

impl<S: Storage, O: ScoringOracle> Clone for LocalContract<S, O> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<S: Storage, O: ScoringOracle> LocalContract<S, O> {
    pub fn new(chaincode: Chaincode<S, O>) -> Self {
        Self {
            inner: Arc::new(chaincode),
        }
    }
}

#[async_trait]
impl<S: Storage + 'static, O: ScoringOracle + 'static> Contract for LocalContract<S, O> {
    async fn submit(&self, ctx: &RequestContext, function: &str, args: &[String]) -> Result<Vec<u8>> {
        ctx.check()?;
        self.inner.invoke(ctx, function, args).await
    }
}

/// Submits and decodes an 8-byte big-endian reply.
pub async fn submit_u64(contract: &dyn Contract, ctx: &RequestContext, function: &str, args: &[String]) -> Result<u64> {
    let bytes = contract.submit(ctx, function, args).await?;
    decode_u64(&bytes).ok_or_else(|| {
        ChaincodeError::Serialization(format!("{function} returned {} bytes, expected 8", bytes.len()))
    })
}

/// Submits and decodes a JSON reply.
pub async fn submit_json<T: DeserializeOwned>(
    contract: &dyn Contract,
    ctx: &RequestContext,
    function: &str,
    args: &[String],
) -> Result<T> {
    let bytes = contract.submit(ctx, function, args).await?;
    serde_json::from_slice(&bytes).map_err(|e| ChaincodeError::Serialization(format!("{function} reply: {e}")))
}

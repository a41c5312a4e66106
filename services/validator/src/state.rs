use std::sync::Arc;

use anyhow::{Context, Result};
use chaincode::{Chaincode, Contract, EndpointTable, HttpOracle, LocalContract, RequestContext};
use ledger::{FileBackedStorage, Ledger};
use tokio_util::sync::CancellationToken;

use crate::client::LedgerClient;
use crate::config::AppConfig;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub client: LedgerClient,
    pub config: AppConfig,
    /// Cancelled on shutdown; every request context hangs off it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(contract: Arc<dyn Contract>, config: AppConfig) -> Self {
        Self {
            client: LedgerClient::new(contract),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// File-backed ledger, HTTP oracles from the configured base URLs.
    pub fn open(config: AppConfig) -> Result<Self> {
        let storage = FileBackedStorage::new(&config.ledger_path)
            .with_context(|| format!("Failed to open ledger at {}", config.ledger_path))?;
        let oracle = HttpOracle::new(EndpointTable::standard(&config.spark_url, &config.mlr3_url))
            .with_timeout(config.oracle_timeout);
        let contract = LocalContract::new(Chaincode::new(Ledger::new(storage), oracle));
        Ok(Self::new(Arc::new(contract), config))
    }

    pub fn request_context(&self) -> RequestContext {
        RequestContext::new().with_cancel(self.shutdown.child_token())
    }
}

use ledger::LedgerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One counterpart that failed during a multi-item validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub counterpart: String,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ChaincodeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Argument error: {0}")]
    Argument(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("{} of {} validations failed", failures.len(), failures.len() + recorded.len())]
    PartialValidation {
        recorded: Vec<String>,
        failures: Vec<ItemFailure>,
    },
}

pub type Result<T> = std::result::Result<T, ChaincodeError>;

/// Structured error body returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recorded: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ItemFailure>,
}

impl ChaincodeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChaincodeError::NotFound(_) => "NotFound",
            ChaincodeError::AlreadyExists(_) => "AlreadyExists",
            ChaincodeError::Serialization(_) => "SerializationError",
            ChaincodeError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            ChaincodeError::Configuration(_) => "ConfigurationError",
            ChaincodeError::Argument(_) => "ArgumentError",
            ChaincodeError::Ledger(_) => "LedgerError",
            ChaincodeError::Cancelled => "Cancelled",
            ChaincodeError::DeadlineExceeded => "DeadlineExceeded",
            ChaincodeError::UnknownFunction(_) => "UnknownFunction",
            ChaincodeError::PartialValidation { .. } => "PartialValidation",
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        let (recorded, failures) = match self {
            ChaincodeError::PartialValidation { recorded, failures } => (recorded.clone(), failures.clone()),
            _ => (Vec::new(), Vec::new()),
        };
        ErrorPayload {
            error: self.kind().to_string(),
            message: self.to_string(),
            recorded,
            failures,
        }
    }

    /// Cancellation and deadline errors end the whole request, not just one item.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, ChaincodeError::Cancelled | ChaincodeError::DeadlineExceeded)
    }
}

impl From<LedgerError> for ChaincodeError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Conflict(key) => ChaincodeError::AlreadyExists(key),
            LedgerError::Serialization(msg) => ChaincodeError::Serialization(msg),
            LedgerError::Storage(msg) => ChaincodeError::Ledger(msg),
        }
    }
}

impl From<serde_json::Error> for ChaincodeError {
    fn from(e: serde_json::Error) -> Self {
        ChaincodeError::Serialization(e.to_string())
    }
}

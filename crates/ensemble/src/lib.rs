//! Ensemble aggregation over recorded validation results: per-model and
//! combined AUC and log-loss, plus permutation attribution of each
//! member's contribution.

pub mod aggregate;
pub mod attribution;
pub mod metrics;

pub use aggregate::*;
pub use attribution::{attribute, Attribution, MAX_EXACT_MEMBERS};
pub use metrics::{auc, log_loss, mean_vector, round3};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("{members} members exceed the exact attribution limit of {max}")]
    TooManyMembers { members: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, EnsembleError>;

//! Model-validation chaincode
//!
//! Stores models, datasets and validation results as ledger records,
//! calls external scoring oracles, and exposes everything as named
//! operations taking positional string arguments.

pub mod codec;
pub mod context;
pub mod contract;
pub mod error;
pub mod facade;
pub mod gateway;
pub mod logistic;
pub mod oracle;
pub mod oracle_http;
pub mod schema;

pub use context::*;
pub use contract::*;
pub use error::*;
pub use gateway::*;
pub use oracle::{Endpoint, EndpointTable, ResponseFormat, ScoringOracle};
pub use oracle_http::HttpOracle;
pub use schema::*;

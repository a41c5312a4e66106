//! Web front end of the validation ledger: uploads, validation triggers
//! and the ensemble report.

pub mod api_error;
pub mod client;
pub mod config;
pub mod csv_table;
pub mod report;
pub mod routes_results;
pub mod routes_upload;
pub mod routes_validate;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub use state::{AppState, SharedState};

pub fn app(app_state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes_results::health))
        .route("/models", post(routes_upload::post_model))
        .route("/datasets", post(routes_upload::post_dataset))
        .route("/validate", post(routes_validate::post_validate))
        .route("/results", get(routes_results::get_results_html))
        .route("/results.json", get(routes_results::get_results_json))
        .route("/ledger/checkpoint", get(routes_results::get_checkpoint))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use ledger::Checkpoint;

use crate::api_error::{reject, ApiError};
use crate::report::{self, Report};
use crate::state::SharedState;

pub async fn health() -> &'static str {
    "validator ok"
}

pub async fn get_results_html(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    let ctx = state.request_context();
    let report = report::build(&state.client, &ctx).await.map_err(reject)?;
    Ok(Html(report::render_html(&report)))
}

pub async fn get_results_json(State(state): State<SharedState>) -> Result<Json<Report>, ApiError> {
    let ctx = state.request_context();
    let report = report::build(&state.client, &ctx).await.map_err(reject)?;
    Ok(Json(report))
}

pub async fn get_checkpoint(State(state): State<SharedState>) -> Result<Json<Checkpoint>, ApiError> {
    let ctx = state.request_context();
    let checkpoint = state.client.checkpoint(&ctx).await.map_err(reject)?;
    Ok(Json(checkpoint))
}

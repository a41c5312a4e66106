use axum::extract::State;
use axum::Json;
use chaincode::ValidationSummary;
use serde::Deserialize;

use crate::api_error::{reject, ApiError};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ValidateReq {
    pub model: String,
    pub dataset: String,
}

pub async fn post_validate(
    State(state): State<SharedState>,
    Json(req): Json<ValidateReq>,
) -> Result<Json<ValidationSummary>, ApiError> {
    let ctx = state.request_context();
    let summary = state
        .client
        .validate(&ctx, &req.model, &req.dataset)
        .await
        .map_err(reject)?;
    Ok(Json(summary))
}

use axum::extract::{Multipart, State};
use axum::{http::StatusCode, Json};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chaincode::{ChaincodeError, Library, ModelFile, ModelKind};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::api_error::{bad_request, reject, ApiError};
use crate::csv_table::CsvTable;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct UploadResp {
    pub request_id: Uuid,
    pub name: String,
    pub id: u64,
    /// Result keys written by validating against existing counterparts.
    pub recorded: Vec<String>,
}

pub async fn post_model(
    State(state): State<SharedState>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<UploadResp>), ApiError> {
    let mut file_bytes: Option<bytes::Bytes> = None;
    let mut model_type: Option<String> = None;
    let mut lib_type: Option<String> = None;
    let mut owner: Option<String> = None;

    while let Some(field) = mp.next_field().await.map_err(|e| bad_request(e.to_string()))? {
        match field.name() {
            Some("modelFile") => file_bytes = Some(field.bytes().await.map_err(|e| bad_request(e.to_string()))?),
            Some("modelType") => model_type = Some(field.text().await.map_err(|e| bad_request(e.to_string()))?),
            Some("libType") => lib_type = Some(field.text().await.map_err(|e| bad_request(e.to_string()))?),
            Some("owner") => owner = Some(field.text().await.map_err(|e| bad_request(e.to_string()))?),
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| bad_request("Missing modelFile"))?;
    let kind: ModelKind = model_type
        .ok_or_else(|| bad_request("Missing modelType"))?
        .trim()
        .parse()
        .map_err(reject)?;
    let library: Library = lib_type
        .ok_or_else(|| bad_request("Missing libType"))?
        .trim()
        .parse()
        .map_err(reject)?;
    let owner = owner
        .filter(|o| !o.trim().is_empty())
        .unwrap_or_else(|| state.config.default_owner.clone());

    let ctx = state.request_context();
    let client = &state.client;
    let payload = URL_SAFE.encode(&bytes);

    if !client.test_model_file(&ctx, &payload, kind, library).await.map_err(reject)? {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ChaincodeError::Argument(format!("{} {} model failed the oracle test", library, kind)).payload()),
        ));
    }

    let id = client.reserve_model_id(&ctx, &owner).await.map_err(reject)?;
    let model = ModelFile::new(format!("Model{id}"), kind, library, owner, id, payload);
    client.init_model_file(&ctx, &model).await.map_err(reject)?;
    info!(request_id = %ctx.request_id, model = %model.name, bytes = bytes.len(), "model uploaded");

    let mut recorded = Vec::new();
    if !client.all_data(&ctx).await.map_err(reject)?.is_empty() {
        recorded = client.inserted_model_file(&ctx, &model.name).await.map_err(reject)?.recorded;
    }

    Ok((
        StatusCode::CREATED,
        Json(UploadResp {
            request_id: ctx.request_id,
            name: model.name,
            id,
            recorded,
        }),
    ))
}

pub async fn post_dataset(
    State(state): State<SharedState>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<UploadResp>), ApiError> {
    let mut file_bytes: Option<bytes::Bytes> = None;
    let mut owner: Option<String> = None;

    while let Some(field) = mp.next_field().await.map_err(|e| bad_request(e.to_string()))? {
        match field.name() {
            Some("dataFile") => file_bytes = Some(field.bytes().await.map_err(|e| bad_request(e.to_string()))?),
            Some("owner") => owner = Some(field.text().await.map_err(|e| bad_request(e.to_string()))?),
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| bad_request("Missing dataFile"))?;
    let text = std::str::from_utf8(&bytes).map_err(|e| bad_request(format!("dataFile is not UTF-8: {e}")))?;
    let table = CsvTable::parse(text).map_err(reject)?;
    let owner = owner
        .filter(|o| !o.trim().is_empty())
        .unwrap_or_else(|| state.config.default_owner.clone());

    let ctx = state.request_context();
    let client = &state.client;

    let id = client.reserve_data_id(&ctx, &owner).await.map_err(reject)?;
    let name = format!("dataCol{id}");
    client.init_flex_data(&ctx, &name, &owner, id, &table).await.map_err(reject)?;
    info!(request_id = %ctx.request_id, dataset = %name, rows = table.rows(), "dataset uploaded");

    let mut recorded = Vec::new();
    if !client.all_models(&ctx).await.map_err(reject)?.is_empty() {
        recorded = client.inserted_data_file(&ctx, &name).await.map_err(reject)?.recorded;
    }

    Ok((
        StatusCode::CREATED,
        Json(UploadResp {
            request_id: ctx.request_id,
            name,
            id,
            recorded,
        }),
    ))
}

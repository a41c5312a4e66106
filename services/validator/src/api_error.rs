use axum::{http::StatusCode, Json};
use chaincode::{ChaincodeError, ErrorPayload};
use tracing::warn;

pub type ApiError = (StatusCode, Json<ErrorPayload>);

pub fn status_for(e: &ChaincodeError) -> StatusCode {
    match e {
        ChaincodeError::NotFound(_) => StatusCode::NOT_FOUND,
        ChaincodeError::AlreadyExists(_) => StatusCode::CONFLICT,
        ChaincodeError::Argument(_) | ChaincodeError::Configuration(_) => StatusCode::BAD_REQUEST,
        ChaincodeError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        ChaincodeError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        ChaincodeError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        // some items were recorded, some were not
        ChaincodeError::PartialValidation { .. } => StatusCode::MULTI_STATUS,
        ChaincodeError::Serialization(_) | ChaincodeError::Ledger(_) | ChaincodeError::UnknownFunction(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn reject(e: ChaincodeError) -> ApiError {
    let status = status_for(&e);
    warn!(status = %status, error = %e, "request failed");
    (status, Json(e.payload()))
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    reject(ChaincodeError::Argument(message.into()))
}

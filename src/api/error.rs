use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::error::CompressError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

/// Every pipeline failure is recovered here into a structured error body;
/// nothing propagates to the caller as an unhandled fault.
impl From<CompressError> for AppError {
    fn from(err: CompressError) -> Self {
        match &err {
            CompressError::InvalidInput => AppError::BadRequest(err.to_string()),
            CompressError::StagingIo(source) => {
                tracing::error!("Staging IO failure: {}", source);
                AppError::Internal(err.to_string())
            }
            CompressError::ToolNotFound => AppError::ServiceUnavailable(err.to_string()),
            CompressError::ToolExecution(_) => AppError::Unprocessable(err.to_string()),
            CompressError::ResultMissing => AppError::Unprocessable(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

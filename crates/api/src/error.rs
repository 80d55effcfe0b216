//! Request Boundary Errors

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_validator::ValidationError;
use inference_engine::InferenceError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned to API clients
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body could not be parsed
    #[error("{0}")]
    BadRequest(String),

    /// Body exceeds `server.max_body_size`
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Payload shape or feature count rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No model held by the server
    #[error("Model not loaded")]
    ModelNotLoaded,

    /// Model raised during prediction
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// Metadata could not be read
    #[error("Failed to get model info: {0}")]
    ModelInfo(String),
}

/// Error body shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub success: bool,
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelNotLoaded | ApiError::Prediction(_) | ApiError::ModelInfo(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Validation(e) => ApiError::Validation(e),
            InferenceError::ModelNotLoaded => ApiError::ModelNotLoaded,
            InferenceError::InferenceFailed(msg) => ApiError::Prediction(msg),
            other => ApiError::Prediction(other.to_string()),
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

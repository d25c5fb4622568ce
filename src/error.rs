//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::storage::StorageError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body is not a transaction document
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// Status code and machine-readable code for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::MalformedBody(_) => (StatusCode::NOT_FOUND, "malformed_body"),
            AppError::Domain(DomainError::InvalidInput(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input")
            }
            AppError::Domain(DomainError::MissingParameter(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "missing_parameter")
            }
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();

        let details = match &self {
            AppError::MalformedBody(msg) => Some(msg.clone()),
            AppError::Domain(DomainError::InvalidInput(msg)) => Some(msg.clone()),
            AppError::Domain(DomainError::MissingParameter(field)) => Some(field.to_string()),
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                None
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

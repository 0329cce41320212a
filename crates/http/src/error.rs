//! Error handling for the shelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let status = self.status();

        let message = match self {
            AppError::Validation(message) | AppError::NotFound(message) => {
                tracing::warn!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    %message,
                    "request rejected"
                );
                message
            }
            AppError::Internal(e) => {
                tracing::error!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    error = ?e,
                    "request failed"
                );
                // Hide internal error details outside debug builds
                if cfg!(debug_assertions) {
                    format!("{e:#}")
                } else {
                    "An internal server error occurred".to_string()
                }
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
        };

        (status, Json(body)).into_response()
    }
}

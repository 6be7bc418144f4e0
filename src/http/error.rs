//! Error-to-response mapping for every handler.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::http::validation::ValidationErrors;
use crate::storage::model::InvalidStatType;
use crate::storage::StorageError;

/// Message returned with every 401.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing API token";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid or missing API token")]
    Unauthorized,

    #[error(transparent)]
    InvalidArgument(#[from] InvalidStatType),

    /// A failure that already knows its HTTP status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Wrap a storage failure with the operation it interrupted.
    ///
    /// Pool exhaustion maps to 503; everything else is a 500.
    pub fn from_storage(context: &str, err: StorageError) -> Self {
        let message = format!("{context}: {err}");
        tracing::error!(error = %err, "{message}");
        match err {
            StorageError::Unavailable(_) => ApiError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message,
            },
            _ => ApiError::Internal(message),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Status { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::Status {
                status,
                message: rejection.body_text(),
            };
        }
        ApiError::Validation(ValidationErrors::single(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(ValidationErrors::single(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => json!({
                "statusCode": status.as_u16(),
                "error": "Bad Request",
                "message": errors.messages(),
            }),
            ApiError::Unauthorized => json!({
                "statusCode": status.as_u16(),
                "error": "Unauthorized",
                "message": UNAUTHORIZED_MESSAGE,
            }),
            ApiError::InvalidArgument(err) => json!({
                "status": "Failed",
                "message": err.to_string(),
            }),
            ApiError::Status { message, .. } | ApiError::Internal(message) => json!({
                "status": "Failed",
                "message": message,
            }),
        };
        (status, Json(body)).into_response()
    }
}

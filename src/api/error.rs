//! HTTP mapping for [`Error`].
//!
//! Validation problems become 422 before anything is allocated, lost races become 409
//! with a code naming the constraint that fired, and store trouble becomes 500 or 503.

use crate::errors::Error;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use tracing::{debug, error, warn};

/// JSON error envelope: `{ "error": { "code", "message", "retryable" } }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details
    pub error: ErrorDetail,
}

/// Machine-readable code plus a human message.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Stable snake_case identifier
    pub code: &'static str,
    /// Human-readable description
    pub message: String,
    /// Whether resubmitting the same request may succeed
    pub retryable: bool,
}

/// Builds a JSON error response.
pub fn error_response(
    status: StatusCode,
    code: &'static str,
    message: String,
    retryable: bool,
) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code,
            message,
            retryable,
        },
    };
    (status, Json(body)).into_response()
}

impl Error {
    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAmount { .. } | Self::Validation { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::RecordNotFound { .. } | Self::UnknownCollection { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateSubmission { .. } | Self::ReceiptNumberCollision { .. } => {
                StatusCode::CONFLICT
            }
            Self::QueryTimeout { .. }
            | Self::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::UnknownSequence { .. } | Self::Database(_) | Self::Config { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable identifier clients can branch on.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "configuration_error",
            Self::Database(_) => "database_error",
            Self::Io(_) => "io_error",
            Self::UnknownSequence { .. } => "unknown_sequence",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::Validation { .. } => "validation_failed",
            Self::RecordNotFound { .. } => "record_not_found",
            Self::UnknownCollection { .. } => "unknown_collection",
            Self::DuplicateSubmission { .. } => "duplicate_submission",
            Self::ReceiptNumberCollision { .. } => "receipt_number_collision",
            Self::QueryTimeout { .. } => "query_timeout",
        }
    }
}

/// Malformed bodies are reported like any other validation failure.
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            // Seeding must have been skipped; this is a deployment bug
            Self::UnknownSequence { transaction_type } => {
                error!(?transaction_type, "Receipt sequence row missing");
            }
            _ if status.is_server_error() => error!(error = %self, "Request failed"),
            _ if status == StatusCode::CONFLICT => warn!(error = %self, "Request conflicted"),
            _ => debug!(error = %self, "Request rejected"),
        }

        // Internal details stay in the log
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        error_response(status, self.code(), message, self.is_retryable())
    }
}

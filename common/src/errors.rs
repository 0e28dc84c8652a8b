//! Error types shared across the service.
//!
//! Every failure the gateway can report maps to exactly one variant; the
//! variant decides the machine-readable code and the HTTP status used when
//! the error escapes to the transport layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used throughout the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application error taxonomy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    /// A caller parameter is missing, empty or malformed.
    #[error("{0}")]
    Validation(String),

    /// The requested driver kind is unknown or not allowed.
    #[error("unsupported driver '{0}'")]
    UnsupportedDriver(String),

    /// Opening a backend handle or probing it failed.
    #[error("{0}")]
    Connection(String),

    /// No connection is registered under the given name.
    #[error("database connection '{0}' not found, create it first with the connect_database tool")]
    ConnectionNotFound(String),

    /// The statement class is not allowed by the policy.
    #[error("{0}")]
    PolicyRejected(String),

    /// The backend failed while running a statement.
    #[error("{0}")]
    Execution(String),

    /// A row could not be decoded.
    #[error("failed to decode row {row}: {message}")]
    Scan { row: usize, message: String },

    /// A blocking operation exceeded its deadline.
    #[error("{0}")]
    Timeout(String),

    /// The environment source could not provide a value.
    #[error("{0}")]
    Environment(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnsupportedDriver(_) => "UNSUPPORTED_DRIVER",
            AppError::Connection(_) => "CONNECTION_ERROR",
            AppError::ConnectionNotFound(_) => "NOT_FOUND",
            AppError::PolicyRejected(_) => "POLICY_REJECTED",
            AppError::Execution(_) => "EXECUTION_ERROR",
            AppError::Scan { .. } => "SCAN_ERROR",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::Environment(_) => "ENVIRONMENT_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status used when the error is returned by a handler.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::UnsupportedDriver(_)
            | AppError::PolicyRejected(_) => StatusCode::BAD_REQUEST,
            AppError::ConnectionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Connection(_) | AppError::Environment(_) => StatusCode::BAD_GATEWAY,
            AppError::Execution(_) | AppError::Scan { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "request rejected");
        }
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_connection_and_hint() {
        let err = AppError::ConnectionNotFound("db2".into());
        let msg = err.to_string();
        assert!(msg.contains("'db2'"));
        assert!(msg.contains("connect_database"));
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_scan_error_carries_row() {
        let err = AppError::Scan {
            row: 7,
            message: "bad utf-8".into(),
        };
        assert_eq!(err.to_string(), "failed to decode row 7: bad utf-8");
        assert_eq!(err.code(), "SCAN_ERROR");
    }
}

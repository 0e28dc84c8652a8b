//! SQL query models.
//!
//! Contains the request, the backend-agnostic values and tables, and the
//! uniform outcome produced for every statement.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::AppError;

/// Arguments of the `database_query` tool.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct QueryRequest {
    /// Name of the connection to use.
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, message = "connection_name is required and must be a non-empty string"))]
    pub connection_name: String,

    /// SQL statement to execute.
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, message = "query is required and must be a non-empty string"))]
    pub query: String,
}

/// A single decoded cell, before textual normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// Normalized, backend-agnostic result of a read statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResultTable {
    /// Column names in statement order.
    pub columns: Vec<String>,
    /// Rows of normalized cell text.
    pub rows: Vec<Vec<String>>,
    /// Number of rows materialized.
    pub row_count: usize,
    /// Whether the row cap stopped the fetch.
    pub truncated: bool,
}

/// Result of a write statement as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WriteSummary {
    /// Rows affected, `None` when the backend cannot tell.
    pub affected_rows: Option<u64>,
    /// Identifier generated by an insert, when the backend reports one.
    pub last_insert_id: Option<i64>,
}

/// Error attached to a failed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable cause.
    pub message: String,
    /// The offending SQL text, when a statement was involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// Uniform outcome of `QueryGateway::execute`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueryOutcome {
    pub success: bool,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<i64>,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl QueryOutcome {
    /// Successful read outcome.
    pub fn read(table: ResultTable) -> Self {
        Self {
            success: true,
            columns: table.columns,
            rows: table.rows,
            row_count: table.row_count,
            truncated: table.truncated,
            ..Default::default()
        }
    }

    /// Successful write outcome.
    pub fn write(summary: WriteSummary) -> Self {
        Self {
            success: true,
            affected_rows: summary.affected_rows,
            last_insert_id: summary.last_insert_id,
            ..Default::default()
        }
    }

    /// Failed outcome carrying the error and the statement text.
    pub fn failed(error: &AppError, sql: &str) -> Self {
        Self {
            success: false,
            error: Some(ErrorDetail {
                code: error.code().to_string(),
                message: error.to_string(),
                sql: Some(sql.to_string()),
            }),
            ..Default::default()
        }
    }

    /// Error code of a failed outcome.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

//! Shared data models.

pub mod connection;
pub mod query;
pub mod tool;

// Re-export commonly used types
pub use connection::{
    ConnectFromEnvRequest, ConnectRequest, ConnectionStatus, ConnectionSummary, DriverKind,
};
pub use query::{ErrorDetail, QueryOutcome, QueryRequest, ResultTable, SqlValue, WriteSummary};
pub use tool::{ToolDescriptor, ToolParameter};

use serde::{Deserialize, Deserializer};

/// Deserializes a string with surrounding whitespace removed, so a blank value
/// fails the same `length(min = 1)` check as an absent one.
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

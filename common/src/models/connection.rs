//! Connection models.
//!
//! Contains the driver enumeration and the request/summary types used to
//! register and list named connections.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::AppError;

/// Backend engine a connection speaks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// PostgreSQL database.
    Postgres,
    /// MySQL or MariaDB database.
    #[serde(rename = "mysql")]
    MySql,
    /// SQLite database file.
    Sqlite,
}

impl DriverKind {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Postgres => "postgres",
            DriverKind::MySql => "mysql",
            DriverKind::Sqlite => "sqlite",
        }
    }

    /// Guesses the driver from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once(':')?;
        scheme.parse().ok()
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DriverKind::Postgres),
            "mysql" | "mariadb" => Ok(DriverKind::MySql),
            "sqlite" | "sqlite3" => Ok(DriverKind::Sqlite),
            other => Err(AppError::UnsupportedDriver(other.to_string())),
        }
    }
}

/// Liveness of a registered connection, computed by probing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum ConnectionStatus {
    Active,
    Disconnected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Active => write!(f, "Active"),
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// One row of the connection listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectionSummary {
    /// Connection name.
    pub name: String,
    /// Driver kind.
    pub driver: DriverKind,
    /// Status observed by the probe at listing time.
    pub status: ConnectionStatus,
}

/// Arguments of the `connect_database` tool.
///
/// Absent fields deserialize as empty and are reported by validation.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ConnectRequest {
    /// Unique name identifying the connection.
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, message = "connection_name is required and must be a non-empty string"))]
    pub connection_name: String,
    /// Driver kind (postgres, mysql, sqlite).
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, message = "driver is required (postgres, mysql, sqlite)"))]
    pub driver: String,
    /// Driver specific connection string.
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, message = "connection_string is required and must be a non-empty string"))]
    pub connection_string: String,
}

/// Arguments of the `connect_database_env` tool.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConnectFromEnvRequest {
    /// Connection name, `default` when absent or empty.
    #[serde(default)]
    pub connection_name: Option<String>,
}

impl ConnectFromEnvRequest {
    pub const DEFAULT_NAME: &'static str = "default";

    /// Effective connection name.
    pub fn name(&self) -> &str {
        match self.connection_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => Self::DEFAULT_NAME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_aliases() {
        assert_eq!("PostgreSQL".parse::<DriverKind>().unwrap(), DriverKind::Postgres);
        assert_eq!("mariadb".parse::<DriverKind>().unwrap(), DriverKind::MySql);
        assert_eq!("sqlite3".parse::<DriverKind>().unwrap(), DriverKind::Sqlite);
        assert!(matches!(
            "oracle".parse::<DriverKind>(),
            Err(AppError::UnsupportedDriver(_))
        ));
    }

    #[test]
    fn test_driver_from_url() {
        assert_eq!(
            DriverKind::from_url("postgres://u:p@localhost/db"),
            Some(DriverKind::Postgres)
        );
        assert_eq!(DriverKind::from_url("sqlite::memory:"), Some(DriverKind::Sqlite));
        assert_eq!(DriverKind::from_url("no-scheme-here"), None);
    }

    #[test]
    fn test_connect_request_rejects_empty_fields() {
        let req = ConnectRequest {
            connection_name: String::new(),
            driver: "postgres".into(),
            connection_string: "postgres://localhost".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_connect_request_trims_fields() {
        let req: ConnectRequest = serde_json::from_value(serde_json::json!({
            "connection_name": "  main ",
            "driver": " sqlite\n",
            "connection_string": "sqlite::memory: ",
        }))
        .unwrap();
        assert_eq!(req.connection_name, "main");
        assert_eq!(req.driver, "sqlite");
        assert_eq!(req.connection_string, "sqlite::memory:");
        assert!(req.validate().is_ok());

        let blank: ConnectRequest = serde_json::from_value(serde_json::json!({
            "connection_name": " \t ",
            "driver": "sqlite",
            "connection_string": "sqlite::memory:",
        }))
        .unwrap();
        let err = blank.validate().unwrap_err();
        assert!(err.to_string().contains("connection_name is required"));
    }

    #[test]
    fn test_env_request_defaults_name() {
        assert_eq!(ConnectFromEnvRequest::default().name(), "default");
        let req = ConnectFromEnvRequest {
            connection_name: Some("  ".into()),
        };
        assert_eq!(req.name(), "default");
    }
}

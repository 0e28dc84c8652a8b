//! Service configuration.
//!
//! Values are read from environment variables with sensible defaults, so the
//! binary runs without any configuration file.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::connection::DriverKind;

/// Runtime configuration of the database tool service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name used in logs and response metadata.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Deadline for opening and probing a backend handle.
    pub connect_timeout_secs: u64,
    /// Deadline for a single statement.
    pub query_timeout_secs: u64,
    /// Pool size for networked backends.
    pub max_connections: u32,
    /// Driver kinds callers may connect with.
    pub allowed_drivers: Vec<DriverKind>,
    /// Env file consulted by `connect_database_env`.
    pub env_file: PathBuf,
    /// Variable holding the database URL.
    pub database_url_var: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "db-tool-service".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8090,
            connect_timeout_secs: 10,
            query_timeout_secs: 30,
            max_connections: 5,
            allowed_drivers: vec![DriverKind::Postgres, DriverKind::MySql, DriverKind::Sqlite],
            env_file: PathBuf::from(".env"),
            database_url_var: "DATABASE_URL".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the process environment.
    pub fn load_with_service(service_name: &str) -> Self {
        let defaults = Self::default();
        Self {
            service_name: service_name.to_string(),
            host: env_or("SERVER_HOST", defaults.host),
            port: env_parse_or("SERVER_PORT", defaults.port),
            connect_timeout_secs: env_parse_or("DB_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs),
            query_timeout_secs: env_parse_or("DB_QUERY_TIMEOUT_SECS", defaults.query_timeout_secs),
            max_connections: env_parse_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            allowed_drivers: std::env::var("DB_ALLOWED_DRIVERS")
                .map(|v| parse_driver_list(&v))
                .unwrap_or(defaults.allowed_drivers),
            env_file: std::env::var("DB_ENV_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.env_file),
            database_url_var: env_or("DB_URL_VAR", defaults.database_url_var),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Parses a comma separated driver list, skipping unknown entries.
pub fn parse_driver_list(value: &str) -> Vec<DriverKind> {
    let mut drivers = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match DriverKind::from_str(item) {
            Ok(kind) if !drivers.contains(&kind) => drivers.push(kind),
            Ok(_) => {}
            Err(_) => tracing::warn!(driver = %item, "ignoring unknown driver in allow-list"),
        }
    }
    drivers
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allows_three_drivers() {
        let config = AppConfig::default();
        assert_eq!(config.allowed_drivers.len(), 3);
        assert_eq!(config.database_url_var, "DATABASE_URL");
    }

    #[test]
    fn test_parse_driver_list_skips_unknown_and_duplicates() {
        let drivers = parse_driver_list("postgres, oracle,postgresql, sqlite,,");
        assert_eq!(drivers, vec![DriverKind::Postgres, DriverKind::Sqlite]);
    }
}

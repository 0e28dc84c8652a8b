//! Backend drivers.
//!
//! Each supported engine implements [`Driver`] (open a handle, describe
//! itself) and hands out a [`DatabaseHandle`] (probe, fetch, execute, close).
//! Adding a backend means adding one module here and one catalog entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{DriverKind, SqlValue, WriteSummary};

/// Streams at most `$max_rows` rows of `$sql` from `$pool`, decoding each row
/// with `$decode`. The fetch stops before pulling a row past the cap.
macro_rules! fetch_capped {
    ($pool:expr, $sql:expr, $max_rows:expr, $decode:path) => {{
        use futures::TryStreamExt;
        use sqlx::{Column, Executor, Row, Statement};

        let pool = $pool;
        let sql: &str = $sql;
        let max_rows: usize = $max_rows;
        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        let mut truncated = false;
        {
            let mut stream = sqlx::query(sql).fetch(pool);
            loop {
                if rows.len() >= max_rows {
                    truncated = true;
                    break;
                }
                let row = match stream.try_next().await {
                    Ok(Some(row)) => row,
                    Ok(None) => break,
                    Err(e) => return Err($crate::drivers::execution_error(&e, rows.len())),
                };
                if columns.is_none() {
                    columns = Some(row.columns().iter().map(|c| c.name().to_string()).collect());
                }
                let row_number = rows.len() + 1;
                let values = $decode(&row, row_number)?;
                rows.push(values);
            }
        }
        // Empty results carry no row to read names from.
        let columns = match columns {
            Some(columns) => columns,
            None => pool
                .prepare(sql)
                .await
                .map_err(|e| $crate::drivers::execution_error(&e, 0))?
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        };
        Ok($crate::drivers::RowSet {
            columns,
            rows,
            truncated,
        })
    }};
}

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::MySqlDriver;
pub use postgres::PostgresDriver;
pub use sqlite::SqliteDriver;

/// Rows produced by a read statement, still carrying typed values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    /// Set when the fetch stopped at the row cap.
    pub truncated: bool,
}

/// A live, driver-specific session owned by the registry.
#[async_trait]
pub trait DatabaseHandle: Send + Sync {
    /// Lightweight liveness check.
    async fn probe(&self) -> AppResult<()>;

    /// Runs a read statement and materializes at most `max_rows` rows.
    async fn fetch(&self, sql: &str, max_rows: usize) -> AppResult<RowSet>;

    /// Runs a write statement.
    async fn execute(&self, sql: &str) -> AppResult<WriteSummary>;

    /// Releases the underlying resources. Idempotent.
    async fn close(&self);
}

/// Capability interface of one driver kind.
#[async_trait]
pub trait Driver: Send + Sync {
    fn kind(&self) -> DriverKind;

    /// Opens a new handle from a driver-specific connection string.
    async fn open(&self, connection_string: &str) -> AppResult<Box<dyn DatabaseHandle>>;

    /// Markdown snippet with starter statements for this backend.
    fn example_statements(&self) -> &'static str;
}

/// Pool options shared by the sqlx drivers.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            acquire_timeout: config.connect_timeout(),
        }
    }
}

/// Drivers available to callers, keyed by kind.
#[derive(Clone, Default)]
pub struct DriverCatalog {
    drivers: HashMap<DriverKind, Arc<dyn Driver>>,
}

impl DriverCatalog {
    /// Builds the catalog of sqlx drivers named in the allow-list.
    pub fn from_config(config: &AppConfig) -> Self {
        let settings = PoolSettings::from_config(config);
        config
            .allowed_drivers
            .iter()
            .fold(Self::default(), |catalog, kind| {
                let driver: Arc<dyn Driver> = match kind {
                    DriverKind::Postgres => Arc::new(PostgresDriver::new(settings)),
                    DriverKind::MySql => Arc::new(MySqlDriver::new(settings)),
                    DriverKind::Sqlite => Arc::new(SqliteDriver::new(settings)),
                };
                catalog.with_driver(driver)
            })
    }

    /// Adds or replaces the driver for its kind.
    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.drivers.insert(driver.kind(), driver);
        self
    }

    /// Returns the driver for `kind`, or `UnsupportedDriver` when it is not allowed.
    pub fn resolve(&self, kind: DriverKind) -> AppResult<Arc<dyn Driver>> {
        self.drivers
            .get(&kind)
            .cloned()
            .ok_or_else(|| AppError::UnsupportedDriver(kind.to_string()))
    }

    /// Allowed driver kinds, in a stable order.
    pub fn supported(&self) -> Vec<DriverKind> {
        let mut kinds: Vec<DriverKind> = self.drivers.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}

/// Maps a sqlx failure while running a statement.
pub(crate) fn execution_error(err: &sqlx::Error, rows_read: usize) -> AppError {
    if rows_read == 0 {
        AppError::Execution(err.to_string())
    } else {
        AppError::Execution(format!("error reading row {}: {}", rows_read + 1, err))
    }
}

/// Maps a failure decoding one cell.
pub(crate) fn scan_error(row: usize, column: &str, err: &sqlx::Error) -> AppError {
    AppError::Scan {
        row,
        message: format!("column '{}': {}", column, err),
    }
}

/// Reads a cell that has no dedicated decoding as text.
///
/// Types the backend cannot hand over as text become a `<TYPE>` placeholder
/// instead of failing the whole row.
pub(crate) fn text_or_placeholder<'r, R>(row: &'r R, index: usize, type_name: &str) -> SqlValue
where
    R: sqlx::Row,
    usize: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    match row.try_get::<String, _>(index) {
        Ok(text) => SqlValue::Text(text),
        Err(e) => {
            tracing::debug!(type_name, error = %e, "no text form, rendering placeholder");
            SqlValue::Text(format!("<{type_name}>"))
        }
    }
}

/// Maps a failure opening or probing a handle.
pub(crate) fn connection_error(err: &sqlx::Error) -> AppError {
    AppError::Connection(err.to_string())
}

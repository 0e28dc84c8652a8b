//! SQLite driver.

use async_trait::async_trait;
use common::errors::AppResult;
use common::models::{DriverKind, SqlValue, WriteSummary};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use super::{connection_error, execution_error, scan_error, DatabaseHandle, Driver, PoolSettings, RowSet};

const EXAMPLES: &str = "```sql
-- List all tables
SELECT name FROM sqlite_master WHERE type='table';

-- Get table structure
SELECT * FROM pragma_table_info('your_table');

-- Sample data query
SELECT * FROM your_table LIMIT 10;
```";

/// Opens single-connection SQLite pools.
pub struct SqliteDriver {
    settings: PoolSettings,
}

impl SqliteDriver {
    pub fn new(settings: PoolSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Sqlite
    }

    async fn open(&self, connection_string: &str) -> AppResult<Box<dyn DatabaseHandle>> {
        let url = normalize_path(connection_string);
        // One connection keeps `sqlite::memory:` databases alive and consistent.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.settings.acquire_timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&url)
            .await
            .map_err(|e| connection_error(&e))?;
        Ok(Box::new(SqliteHandle { pool }))
    }

    fn example_statements(&self) -> &'static str {
        EXAMPLES
    }
}

/// Accepts `sqlite:` URLs and plain file paths.
fn normalize_path(connection_string: &str) -> String {
    if connection_string.starts_with("sqlite:") {
        connection_string.to_string()
    } else {
        format!("sqlite:{}?mode=rwc", connection_string)
    }
}

struct SqliteHandle {
    pool: SqlitePool,
}

#[async_trait]
impl DatabaseHandle for SqliteHandle {
    async fn probe(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| connection_error(&e))?;
        Ok(())
    }

    async fn fetch(&self, sql: &str, max_rows: usize) -> AppResult<RowSet> {
        fetch_capped!(&self.pool, sql, max_rows, decode_row)
    }

    async fn execute(&self, sql: &str) -> AppResult<WriteSummary> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| execution_error(&e, 0))?;
        let last_insert_id = (result.rows_affected() > 0).then(|| result.last_insert_rowid());
        Ok(WriteSummary {
            affected_rows: Some(result.rows_affected()),
            last_insert_id,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_row(row: &SqliteRow, row_number: usize) -> AppResult<Vec<SqlValue>> {
    row.columns()
        .iter()
        .map(|column| {
            decode_value(row, column.ordinal())
                .map_err(|e| scan_error(row_number, column.name(), &e))
        })
        .collect()
}

// SQLite reports the storage class of each value, not the declared type.
fn decode_value(row: &SqliteRow, index: usize) -> Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let value = match raw.type_info().name() {
        "INTEGER" | "BIGINT" | "INT8" => SqlValue::Int(row.try_get(index)?),
        "BOOLEAN" => SqlValue::Bool(row.try_get(index)?),
        "REAL" => SqlValue::Float(row.try_get(index)?),
        "BLOB" => SqlValue::Bytes(row.try_get(index)?),
        // invalid UTF-8 fails the row rather than rendering a placeholder
        _ => SqlValue::Text(row.try_get(index)?),
    };
    Ok(value)
}

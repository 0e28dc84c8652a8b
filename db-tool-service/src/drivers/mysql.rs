//! MySQL / MariaDB driver.

use async_trait::async_trait;
use common::errors::AppResult;
use common::models::{DriverKind, SqlValue, WriteSummary};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, JsonValue};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use super::{
    connection_error, execution_error, scan_error, text_or_placeholder, DatabaseHandle, Driver,
    PoolSettings, RowSet,
};

const EXAMPLES: &str = "```sql
-- List all tables
SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE();

-- Get table structure
SELECT column_name, column_type, is_nullable FROM information_schema.columns WHERE table_schema = DATABASE() AND table_name = 'your_table';

-- Sample data query
SELECT * FROM your_table LIMIT 10;
```";

/// Opens pooled MySQL sessions.
pub struct MySqlDriver {
    settings: PoolSettings,
}

impl MySqlDriver {
    pub fn new(settings: PoolSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::MySql
    }

    async fn open(&self, connection_string: &str) -> AppResult<Box<dyn DatabaseHandle>> {
        let url = normalize_dsn(connection_string);
        let pool = MySqlPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .acquire_timeout(self.settings.acquire_timeout)
            .connect(&url)
            .await
            .map_err(|e| connection_error(&e))?;
        Ok(Box::new(MySqlHandle { pool }))
    }

    fn example_statements(&self) -> &'static str {
        EXAMPLES
    }
}

/// Accepts both `mysql://` URLs and `user:pass@tcp(host:port)/db` DSNs.
fn normalize_dsn(connection_string: &str) -> String {
    if connection_string.contains("://") {
        return connection_string.to_string();
    }
    if let Some((credentials, rest)) = connection_string.split_once("@tcp(") {
        if let Some((address, tail)) = rest.split_once(')') {
            return format!("mysql://{}@{}{}", credentials, address, tail);
        }
    }
    format!("mysql://{}", connection_string)
}

struct MySqlHandle {
    pool: MySqlPool,
}

#[async_trait]
impl DatabaseHandle for MySqlHandle {
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
        let last_insert_id = match result.last_insert_id() {
            0 => None,
            id => i64::try_from(id).ok(),
        };
        Ok(WriteSummary {
            affected_rows: Some(result.rows_affected()),
            last_insert_id,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_row(row: &MySqlRow, row_number: usize) -> AppResult<Vec<SqlValue>> {
    row.columns()
        .iter()
        .map(|column| {
            decode_value(row, column.ordinal())
                .map_err(|e| scan_error(row_number, column.name(), &e))
        })
        .collect()
}

fn decode_value(row: &MySqlRow, index: usize) -> Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let value = match raw.type_info().name() {
        "BOOLEAN" => SqlValue::Bool(row.try_get(index)?),
        // sent as a two-byte integer, which sqlx does not type-match to u16
        "YEAR" => SqlValue::UInt(row.try_get_unchecked::<u16, _>(index)?.into()),
        name if name.ends_with("UNSIGNED") => SqlValue::UInt(row.try_get(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => SqlValue::Int(row.try_get(index)?),
        "FLOAT" => SqlValue::Float(row.try_get::<f32, _>(index)?.into()),
        "DOUBLE" => SqlValue::Float(row.try_get(index)?),
        "DECIMAL" => SqlValue::Text(row.try_get::<Decimal, _>(index)?.to_string()),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            SqlValue::Bytes(row.try_get(index)?)
        }
        "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            SqlValue::Text(row.try_get(index)?)
        }
        "JSON" => SqlValue::Text(row.try_get::<JsonValue, _>(index)?.to_string()),
        "DATE" => SqlValue::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => SqlValue::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        "DATETIME" => SqlValue::Text(row.try_get::<NaiveDateTime, _>(index)?.to_string()),
        "TIMESTAMP" => SqlValue::Text(row.try_get::<DateTime<Utc>, _>(index)?.to_string()),
        other => text_or_placeholder(row, index, other),
    };
    Ok(value)
}

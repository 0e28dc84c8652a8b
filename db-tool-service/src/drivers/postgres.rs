//! PostgreSQL driver.

use async_trait::async_trait;
use common::errors::AppResult;
use common::models::{DriverKind, SqlValue, WriteSummary};
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use super::{
    connection_error, execution_error, scan_error, text_or_placeholder, DatabaseHandle, Driver,
    PoolSettings, RowSet,
};

const EXAMPLES: &str = "```sql
-- List all tables
SELECT tablename FROM pg_tables WHERE schemaname = 'public';

-- Get table structure
SELECT column_name, data_type, is_nullable FROM information_schema.columns WHERE table_name = 'your_table';

-- Sample data query
SELECT * FROM your_table LIMIT 10;
```";

/// Opens pooled PostgreSQL sessions.
pub struct PostgresDriver {
    settings: PoolSettings,
}

impl PostgresDriver {
    pub fn new(settings: PoolSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Postgres
    }

    async fn open(&self, connection_string: &str) -> AppResult<Box<dyn DatabaseHandle>> {
        let pool = PgPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .acquire_timeout(self.settings.acquire_timeout)
            .connect(connection_string)
            .await
            .map_err(|e| connection_error(&e))?;
        Ok(Box::new(PostgresHandle { pool }))
    }

    fn example_statements(&self) -> &'static str {
        EXAMPLES
    }
}

struct PostgresHandle {
    pool: PgPool,
}

#[async_trait]
impl DatabaseHandle for PostgresHandle {
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
        // No generic last-insert id without RETURNING.
        Ok(WriteSummary {
            affected_rows: Some(result.rows_affected()),
            last_insert_id: None,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_row(row: &PgRow, row_number: usize) -> AppResult<Vec<SqlValue>> {
    row.columns()
        .iter()
        .map(|column| {
            decode_value(row, column.ordinal())
                .map_err(|e| scan_error(row_number, column.name(), &e))
        })
        .collect()
}

fn decode_value(row: &PgRow, index: usize) -> Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let value = match raw.type_info().name() {
        "BOOL" => SqlValue::Bool(row.try_get(index)?),
        "INT2" => SqlValue::Int(row.try_get::<i16, _>(index)?.into()),
        "INT4" => SqlValue::Int(row.try_get::<i32, _>(index)?.into()),
        "INT8" => SqlValue::Int(row.try_get(index)?),
        "OID" => SqlValue::UInt(row.try_get::<Oid, _>(index)?.0.into()),
        "FLOAT4" => SqlValue::Float(row.try_get::<f32, _>(index)?.into()),
        "FLOAT8" => SqlValue::Float(row.try_get(index)?),
        "NUMERIC" => SqlValue::Text(row.try_get::<Decimal, _>(index)?.to_string()),
        "MONEY" => SqlValue::Text(row.try_get::<PgMoney, _>(index)?.to_decimal(2).to_string()),
        "TEXT" | "VARCHAR" | "CHAR" | "NAME" => SqlValue::Text(row.try_get(index)?),
        // the single-byte internal type, not BPCHAR
        "\"CHAR\"" => SqlValue::Text(char::from(row.try_get::<i8, _>(index)? as u8).to_string()),
        "BYTEA" => SqlValue::Bytes(row.try_get(index)?),
        "JSON" | "JSONB" => SqlValue::Text(row.try_get::<JsonValue, _>(index)?.to_string()),
        "UUID" => SqlValue::Text(row.try_get::<Uuid, _>(index)?.to_string()),
        "DATE" => SqlValue::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => SqlValue::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        "TIMETZ" => {
            let value: PgTimeTz<NaiveTime, FixedOffset> = row.try_get(index)?;
            SqlValue::Text(format!("{}{}", value.time, value.offset))
        }
        "TIMESTAMP" => SqlValue::Text(row.try_get::<NaiveDateTime, _>(index)?.to_string()),
        "TIMESTAMPTZ" => SqlValue::Text(row.try_get::<DateTime<Utc>, _>(index)?.to_string()),
        "INTERVAL" => SqlValue::Text(format_interval(&row.try_get::<PgInterval, _>(index)?)),
        "BOOL[]" => SqlValue::Text(format_array(row.try_get::<Vec<Option<bool>>, _>(index)?)),
        "INT2[]" => SqlValue::Text(format_array(row.try_get::<Vec<Option<i16>>, _>(index)?)),
        "INT4[]" => SqlValue::Text(format_array(row.try_get::<Vec<Option<i32>>, _>(index)?)),
        "INT8[]" => SqlValue::Text(format_array(row.try_get::<Vec<Option<i64>>, _>(index)?)),
        "FLOAT4[]" => SqlValue::Text(format_array(row.try_get::<Vec<Option<f32>>, _>(index)?)),
        "FLOAT8[]" => SqlValue::Text(format_array(row.try_get::<Vec<Option<f64>>, _>(index)?)),
        "NUMERIC[]" => SqlValue::Text(format_array(row.try_get::<Vec<Option<Decimal>>, _>(index)?)),
        "UUID[]" => SqlValue::Text(format_array(row.try_get::<Vec<Option<Uuid>>, _>(index)?)),
        "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "NAME[]" => {
            SqlValue::Text(format_array(row.try_get::<Vec<Option<String>>, _>(index)?))
        }
        other => text_or_placeholder(row, index, other),
    };
    Ok(value)
}

/// Renders an interval the way `psql` prints it, e.g. `1 year 2 mons 3 days 04:05:06`.
fn format_interval(interval: &PgInterval) -> String {
    fn unit(value: i64, singular: &str, plural: &str) -> String {
        format!("{value} {}", if value == 1 { singular } else { plural })
    }

    let mut parts = Vec::new();
    let years = i64::from(interval.months / 12);
    let months = i64::from(interval.months % 12);
    if years != 0 {
        parts.push(unit(years, "year", "years"));
    }
    if months != 0 {
        parts.push(unit(months, "mon", "mons"));
    }
    if interval.days != 0 {
        parts.push(unit(interval.days.into(), "day", "days"));
    }
    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let total = interval.microseconds.unsigned_abs();
        let seconds = total / 1_000_000;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60
        );
        let fraction = total % 1_000_000;
        if fraction != 0 {
            let digits = format!("{fraction:06}");
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

/// Renders a one-dimensional array in Postgres literal form: `{1,2,NULL}`.
fn format_array<T: ToString>(items: Vec<Option<T>>) -> String {
    let items: Vec<String> = items
        .into_iter()
        .map(|item| item.map_or_else(|| "NULL".to_string(), |v| v.to_string()))
        .collect();
    format!("{{{}}}", items.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(months: i32, days: i32, microseconds: i64) -> String {
        format_interval(&PgInterval {
            months,
            days,
            microseconds,
        })
    }

    #[test]
    fn test_interval_text() {
        assert_eq!(interval(0, 1, 0), "1 day");
        assert_eq!(interval(14, 3, 3_723_000_500), "1 year 2 mons 3 days 01:02:03.0005");
        assert_eq!(interval(0, 0, -3_600_000_000), "-01:00:00");
        assert_eq!(interval(0, 0, 0), "00:00:00");
        assert_eq!(interval(1, 2, 0), "1 mon 2 days");
    }

    #[test]
    fn test_array_text() {
        assert_eq!(format_array(vec![Some(1), None, Some(3)]), "{1,NULL,3}");
        assert_eq!(format_array::<i32>(Vec::new()), "{}");
        assert_eq!(format_array(vec![Some("a"), Some("b")]), "{a,b}");
    }

    #[test]
    fn test_examples_cover_tables_and_columns() {
        assert!(EXAMPLES.contains("pg_tables"));
        assert!(EXAMPLES.contains("information_schema.columns"));
    }
}

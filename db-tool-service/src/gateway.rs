//! Query gateway.
//!
//! Single entry point for the tool operations. Statements pass the classifier
//! before any registry lookup, run under the query deadline, and every failure
//! comes back as a normal [`QueryOutcome`] instead of an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::errors::{AppError, AppResult};
use common::models::{ConnectionSummary, DriverKind, QueryOutcome};
use common::utils::{mask_connection_url, SqlClassifier, StatementClass};
use tokio::time::timeout;

use crate::environment::EnvironmentSource;
use crate::registry::{Connection, ConnectionRegistry};
use crate::render::to_result_table;

/// Hard cap on rows materialized by a read.
pub const MAX_ROWS: usize = 100;

/// What a successful connect reports back.
#[derive(Debug, Clone)]
pub struct ConnectReceipt {
    pub name: String,
    pub driver: DriverKind,
    /// Starter statements for the driver, as markdown.
    pub examples: &'static str,
    /// URL with the password masked, for env-based connects.
    pub masked_url: Option<String>,
}

pub struct QueryGateway {
    registry: Arc<ConnectionRegistry>,
    environment: EnvironmentSource,
    query_timeout: Duration,
}

impl QueryGateway {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        environment: EnvironmentSource,
        query_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            environment,
            query_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Opens (or replaces) the connection `name`.
    pub async fn connect(
        &self,
        name: &str,
        driver: &str,
        connection_string: &str,
    ) -> AppResult<ConnectReceipt> {
        let kind: DriverKind = driver.parse()?;
        let connection = self.registry.register(name, kind, connection_string).await?;
        self.receipt(&connection, None)
    }

    /// Opens `name` from the database URL in the environment source.
    pub async fn connect_from_env(&self, name: &str) -> AppResult<ConnectReceipt> {
        let url = self.environment.database_url()?;
        let masked = mask_connection_url(&url);
        let kind = DriverKind::from_url(&url).unwrap_or(DriverKind::Postgres);
        tracing::info!(name = %name, driver = %kind, url = %masked, "connecting from environment");

        let connection = self.registry.register(name, kind, &url).await?;
        self.receipt(&connection, Some(masked))
    }

    /// Runs one statement against the connection `name`.
    pub async fn execute(&self, name: &str, sql: &str) -> QueryOutcome {
        let started = Instant::now();
        let outcome = match self.run(name, sql).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(name = %name, code = e.code(), error = %e, "query failed");
                QueryOutcome::failed(&e, sql)
            }
        };
        tracing::info!(
            name = %name,
            success = outcome.success,
            rows = outcome.row_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query finished"
        );
        outcome
    }

    pub async fn list_connections(&self) -> Vec<ConnectionSummary> {
        self.registry.list().await
    }

    async fn run(&self, name: &str, sql: &str) -> AppResult<QueryOutcome> {
        let class = SqlClassifier::classify(sql);
        tracing::debug!(name = %name, class = ?class, "statement classified");
        if class == StatementClass::Rejected {
            return Err(rejection(sql));
        }

        let connection = self.registry.lookup(name).await?;
        let handle = connection.handle();

        match class {
            StatementClass::Read => {
                let set = self.deadline(handle.fetch(sql, MAX_ROWS)).await?;
                Ok(QueryOutcome::read(to_result_table(set)))
            }
            StatementClass::Write => {
                let summary = self.deadline(handle.execute(sql)).await?;
                Ok(QueryOutcome::write(summary))
            }
            StatementClass::Rejected => Err(rejection(sql)),
        }
    }

    // A timeout abandons the call but leaves the connection registered.
    async fn deadline<T>(
        &self,
        call: impl std::future::Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        match timeout(self.query_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "query timed out after {}s",
                self.query_timeout.as_secs_f64()
            ))),
        }
    }

    fn receipt(
        &self,
        connection: &Connection,
        masked_url: Option<String>,
    ) -> AppResult<ConnectReceipt> {
        let driver = self.registry.driver(connection.driver())?;
        Ok(ConnectReceipt {
            name: connection.name().to_string(),
            driver: connection.driver(),
            examples: driver.example_statements(),
            masked_url,
        })
    }
}

fn rejection(sql: &str) -> AppError {
    if sql.contains("/*!") || sql.contains("/*M!") {
        return AppError::PolicyRejected(
            "executable comments (/*! ... */) are not allowed".to_string(),
        );
    }
    let message = match SqlClassifier::leading_keyword(sql) {
        Some(keyword) if keyword == "SELECT" || keyword == "INSERT" => {
            "only a single SELECT or INSERT statement can be executed at a time".to_string()
        }
        Some(keyword) => format!(
            "{keyword} statements are not allowed, only SELECT and INSERT can be executed"
        ),
        None => "the statement could not be classified, only SELECT and INSERT can be executed"
            .to_string(),
    };
    AppError::PolicyRejected(message)
}

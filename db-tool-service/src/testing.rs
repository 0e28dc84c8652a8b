//! In-memory driver used by unit tests.
//!
//! Connection strings select handle behavior:
//! `stub://ok`, `stub://probe-fails` and `stub://slow-open`.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::errors::{AppError, AppResult};
use common::models::{DriverKind, SqlValue, WriteSummary};

use crate::drivers::{DatabaseHandle, Driver, RowSet};

#[derive(Default)]
struct BackendState {
    opened: AtomicUsize,
    closed: AtomicUsize,
    fetches: AtomicUsize,
    executes: AtomicUsize,
    unhealthy: AtomicBool,
    rows: AtomicUsize,
    delay_ms: AtomicU64,
}

/// Counters and knobs shared by every handle a [`StubDriver`] opens.
#[derive(Clone, Default)]
pub struct StubBackend {
    state: Arc<BackendState>,
}

impl StubBackend {
    pub fn with_rows(rows: usize) -> Self {
        let backend = Self::default();
        backend.state.rows.store(rows, Ordering::SeqCst);
        backend
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    /// Delays every fetch and execute.
    pub fn set_delay(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }

    pub fn executes(&self) -> usize {
        self.state.executes.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let ms = self.state.delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

pub struct StubDriver {
    kind: DriverKind,
    backend: StubBackend,
}

impl StubDriver {
    pub fn new(kind: DriverKind, backend: StubBackend) -> Self {
        Self { kind, backend }
    }
}

#[async_trait]
impl Driver for StubDriver {
    fn kind(&self) -> DriverKind {
        self.kind
    }

    async fn open(&self, connection_string: &str) -> AppResult<Box<dyn DatabaseHandle>> {
        if connection_string.contains("slow-open") {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if !connection_string.starts_with("stub://") {
            return Err(AppError::Connection(format!(
                "cannot parse connection string for {}",
                self.kind
            )));
        }
        self.backend.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubHandle {
            backend: self.backend.clone(),
            label: connection_string.to_string(),
            probe_fails: connection_string.contains("probe-fails"),
            closed: AtomicBool::new(false),
        }))
    }

    fn example_statements(&self) -> &'static str {
        "```sql\nSELECT 1;\n```"
    }
}

struct StubHandle {
    backend: StubBackend,
    label: String,
    probe_fails: bool,
    closed: AtomicBool,
}

impl StubHandle {
    fn ensure_open(&self) -> AppResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::Execution("handle is closed".into()));
        }
        Ok(())
    }
}

// Dropping the last reference releases the handle like a dropped pool.
impl Drop for StubHandle {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.backend.state.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl DatabaseHandle for StubHandle {
    async fn probe(&self) -> AppResult<()> {
        if self.probe_fails
            || self.closed.load(Ordering::SeqCst)
            || self.backend.state.unhealthy.load(Ordering::SeqCst)
        {
            return Err(AppError::Connection("connection refused".into()));
        }
        Ok(())
    }

    async fn fetch(&self, _sql: &str, max_rows: usize) -> AppResult<RowSet> {
        self.ensure_open()?;
        self.backend.state.fetches.fetch_add(1, Ordering::SeqCst);
        self.backend.pause().await;
        self.ensure_open()?;

        let available = self.backend.state.rows.load(Ordering::SeqCst);
        let rows = (1..=available.min(max_rows))
            .map(|n| vec![SqlValue::Int(n as i64), SqlValue::Text(self.label.clone())])
            .collect();
        Ok(RowSet {
            columns: vec!["n".into(), "source".into()],
            rows,
            truncated: available > max_rows,
        })
    }

    async fn execute(&self, _sql: &str) -> AppResult<WriteSummary> {
        self.ensure_open()?;
        self.backend.state.executes.fetch_add(1, Ordering::SeqCst);
        self.backend.pause().await;
        Ok(WriteSummary {
            affected_rows: Some(1),
            last_insert_id: Some(7),
        })
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.backend.state.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

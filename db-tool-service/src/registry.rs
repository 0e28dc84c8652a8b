//! Connection registry.
//!
//! Owns every live backend handle, keyed by the caller-chosen connection name.
//! The name map sits behind a read/write lock that is only held for lookups
//! and structural changes, never across backend I/O. Registrations for the
//! same name are serialized by a per-name mutex, so unrelated names never
//! wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use common::errors::{AppError, AppResult};
use common::models::{ConnectionStatus, ConnectionSummary, DriverKind};
use futures::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;

use crate::drivers::{DatabaseHandle, Driver, DriverCatalog};

/// A named, open backend handle.
pub struct Connection {
    name: String,
    driver: DriverKind,
    handle: Box<dyn DatabaseHandle>,
}

impl Connection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver(&self) -> DriverKind {
        self.driver
    }

    /// The backend handle. Callers must not close it.
    pub fn handle(&self) -> &dyn DatabaseHandle {
        self.handle.as_ref()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

/// Process-wide store of named connections.
pub struct ConnectionRegistry {
    catalog: DriverCatalog,
    connect_timeout: Duration,
    connections: RwLock<HashMap<String, Arc<Connection>>>,
    /// Serializes `register` per name.
    name_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new(catalog: DriverCatalog, connect_timeout: Duration) -> Self {
        Self {
            catalog,
            connect_timeout,
            connections: RwLock::new(HashMap::new()),
            name_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &DriverCatalog {
        &self.catalog
    }

    /// Resolves the driver for `kind` against the allow-list.
    pub fn driver(&self, kind: DriverKind) -> AppResult<Arc<dyn Driver>> {
        self.catalog.resolve(kind)
    }

    /// Opens, probes and installs a connection under `name`.
    ///
    /// On failure the registry is left unchanged. On success an existing entry
    /// is replaced; the new entry is visible before the old handle is released.
    pub async fn register(
        &self,
        name: &str,
        driver_kind: DriverKind,
        connection_string: &str,
    ) -> AppResult<Arc<Connection>> {
        let driver = self.catalog.resolve(driver_kind)?;

        let name_lock = self.name_lock(name)?;
        let result = {
            let _guard = name_lock.lock().await;
            self.open_and_install(name, driver_kind, driver.as_ref(), connection_string)
                .await
        };
        self.release_name_lock(name, name_lock);
        result
    }

    async fn open_and_install(
        &self,
        name: &str,
        driver_kind: DriverKind,
        driver: &dyn Driver,
        connection_string: &str,
    ) -> AppResult<Arc<Connection>> {
        let handle = match timeout(self.connect_timeout, driver.open(connection_string)).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                tracing::warn!(name = %name, driver = %driver_kind, error = %e, "failed to open connection");
                return Err(e);
            }
            Err(_) => {
                tracing::warn!(name = %name, driver = %driver_kind, "timed out opening connection");
                return Err(AppError::Timeout(format!(
                    "opening the {} connection timed out after {}s",
                    driver_kind,
                    self.connect_timeout.as_secs()
                )));
            }
        };

        let probe = match timeout(self.connect_timeout, handle.probe()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "probing the {} connection timed out after {}s",
                driver_kind,
                self.connect_timeout.as_secs()
            ))),
        };
        if let Err(e) = probe {
            tracing::warn!(name = %name, driver = %driver_kind, error = %e, "liveness probe failed, discarding handle");
            handle.close().await;
            return Err(e);
        }

        let connection = Arc::new(Connection {
            name: name.to_string(),
            driver: driver_kind,
            handle,
        });

        let previous = self
            .connections
            .write()
            .await
            .insert(name.to_string(), Arc::clone(&connection));

        match previous {
            Some(old) => {
                tracing::info!(name = %name, driver = %driver_kind, previous = %old.driver, "connection replaced");
                retire(old).await;
            }
            None => tracing::info!(name = %name, driver = %driver_kind, "connection registered"),
        }

        Ok(connection)
    }

    /// Returns the connection registered under `name`.
    pub async fn lookup(&self, name: &str) -> AppResult<Arc<Connection>> {
        self.connections
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::ConnectionNotFound(name.to_string()))
    }

    /// Lists every connection with a status probed now, sorted by name.
    pub async fn list(&self) -> Vec<ConnectionSummary> {
        let mut snapshot: Vec<Arc<Connection>> =
            self.connections.read().await.values().cloned().collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));

        let probes = snapshot.iter().map(|conn| async move {
            let status = match timeout(self.connect_timeout, conn.handle.probe()).await {
                Ok(Ok(())) => ConnectionStatus::Active,
                Ok(Err(e)) => {
                    tracing::warn!(name = %conn.name, error = %e, "probe failed");
                    ConnectionStatus::Disconnected
                }
                Err(_) => {
                    tracing::warn!(name = %conn.name, "probe timed out");
                    ConnectionStatus::Disconnected
                }
            };
            ConnectionSummary {
                name: conn.name.clone(),
                driver: conn.driver,
                status,
            }
        });
        join_all(probes).await
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Releases every handle. Safe to call more than once.
    pub async fn close_all(&self) {
        let drained: Vec<Arc<Connection>> = self
            .connections
            .write()
            .await
            .drain()
            .map(|(_, conn)| conn)
            .collect();
        if drained.is_empty() {
            return;
        }
        tracing::info!(count = drained.len(), "closing all connections");
        for conn in drained {
            retire(conn).await;
        }
    }

    fn name_lock(&self, name: &str) -> AppResult<Arc<Mutex<()>>> {
        let mut locks = self
            .name_locks
            .lock()
            .map_err(|_| AppError::Internal("registration lock poisoned".into()))?;
        Ok(Arc::clone(locks.entry(name.to_string()).or_default()))
    }

    /// Drops the per-name lock once no other registration holds or awaits it.
    fn release_name_lock(&self, name: &str, lock: Arc<Mutex<()>>) {
        let Ok(mut locks) = self.name_locks.lock() else {
            return;
        };
        // the map entry plus `lock`
        if Arc::strong_count(&lock) == 2 {
            locks.remove(name);
        }
    }
}

/// Releases a connection that is no longer reachable through the map.
///
/// If no in-flight call still holds it, the handle is closed now. Otherwise
/// the last holder drops it and the backend releases its sessions then.
async fn retire(conn: Arc<Connection>) {
    match Arc::try_unwrap(conn) {
        Ok(conn) => {
            conn.handle.close().await;
            tracing::debug!(name = %conn.name, "handle closed");
        }
        Err(shared) => {
            tracing::debug!(
                name = %shared.name,
                holders = Arc::strong_count(&shared) - 1,
                "handle still in use, released by last holder"
            );
        }
    }
}

//! Application state for the database tool service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::drivers::DriverCatalog;
use crate::environment::EnvironmentSource;
use crate::gateway::QueryGateway;
use crate::registry::ConnectionRegistry;
use crate::tools::ToolDispatcher;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub tools: ToolDispatcher,
}

impl AppState {
    /// Builds the state with the sqlx drivers named in the config.
    pub fn new(config: AppConfig) -> Self {
        let catalog = DriverCatalog::from_config(&config);
        Self::with_catalog(config, catalog)
    }

    pub fn with_catalog(config: AppConfig, catalog: DriverCatalog) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(catalog, config.connect_timeout()));
        let gateway = QueryGateway::new(
            registry,
            EnvironmentSource::from_config(&config),
            config.query_timeout(),
        );
        Self {
            tools: ToolDispatcher::new(Arc::new(gateway)),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.tools.gateway().registry()
    }
}

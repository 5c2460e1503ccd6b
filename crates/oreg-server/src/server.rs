use std::sync::Arc;

use oreg_driver::{FilesystemDriver, InMemoryDriver, StorageDriver};
use oreg_storage::Registry;
use tokio::net::TcpListener;

use crate::config::{ServerConfig, StorageConfig};
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Registry HTTP server.
pub struct OregServer {
    config: ServerConfig,
    registry: Registry,
}

impl OregServer {
    /// Build a server and the storage driver its config names.
    pub fn new(config: ServerConfig) -> Self {
        let registry = Registry::new(build_driver(&config.storage));
        Self { config, registry }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        let state = AppState::new(Arc::new(self.registry.clone()))
            .with_request_timeout(self.config.request_timeout());
        build_router(state)
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            driver = self.registry.driver().name(),
            "oreg server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

pub fn build_driver(storage: &StorageConfig) -> Arc<dyn StorageDriver> {
    match storage {
        StorageConfig::InMemory => Arc::new(InMemoryDriver::new()),
        StorageConfig::Filesystem { root_directory } => {
            Arc::new(FilesystemDriver::new(root_directory.clone()))
        }
    }
}

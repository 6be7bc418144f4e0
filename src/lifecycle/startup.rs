//! Startup orchestration.

use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::observability::metrics;
use crate::service::HealthLogService;
use crate::storage::{LogStore, SqliteLogStore, StorageError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("storage initialisation failed: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics exporter failed: {0}")]
    Metrics(#[from] BuildError),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(String),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// A fully initialised service, bound and ready to serve.
pub struct Application {
    server: HttpServer,
    listener: TcpListener,
    store: SqliteLogStore,
}

impl Application {
    /// Initialise subsystems in dependency order and bind the listener.
    pub async fn build(config: &ServiceConfig) -> Result<Self, StartupError> {
        if config.observability.metrics_enabled {
            let address: SocketAddr = config
                .observability
                .metrics_address
                .parse()
                .map_err(|_| {
                    StartupError::MetricsAddress(config.observability.metrics_address.clone())
                })?;
            metrics::init_metrics(address)?;
        }

        let store = SqliteLogStore::connect(&config.storage).await?;
        let stored = store.count().await?;
        tracing::info!(
            database_url = %config.storage.database_url,
            stored,
            "Storage ready"
        );

        let service = Arc::new(HealthLogService::new(Arc::new(store.clone())));
        let server = HttpServer::new(config, service);

        let address = config.listener.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind { address, source })?;

        Ok(Self {
            server,
            listener,
            store,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` fires, then close the storage pool.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) -> Result<(), StartupError> {
        let served = self.server.run(self.listener, shutdown).await;
        self.store.close().await;
        served.map_err(StartupError::Serve)
    }
}

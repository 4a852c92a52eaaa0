//! HTTP user service
//!
//! One instance runs per worker process. The dataset is loaded before the
//! listener is bound; a load failure aborts the worker without ever accepting
//! a connection.

pub mod middleware;
mod routes;

pub use middleware::{
    MemoryRequestLogger, RequestLogger, RequestRecord, SilentRequestLogger, TracingRequestLogger,
};

use crate::config::LISTEN_BACKLOG;
use crate::dataset::{Dataset, DatasetSource};
use crate::error::ServiceError;
use crate::platform;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Everything a worker needs to come up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub addr: SocketAddr,
    pub dataset: DatasetSource,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) dataset: Arc<Dataset>,
}

pub struct Service {
    dataset: Arc<Dataset>,
    logger: Arc<dyn RequestLogger>,
}

impl Service {
    pub fn new(dataset: Dataset, logger: Arc<dyn RequestLogger>) -> Self {
        Self {
            dataset: Arc::new(dataset),
            logger,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Route table wrapped in the middleware chain.
    ///
    /// Layers are applied in order, so the last one listed is the outermost
    /// and sees the full request/response cycle.
    pub fn router(&self) -> Router {
        let routes = Router::new()
            .route("/", get(routes::root))
            .route("/api/", get(routes::api_root))
            .route("/api/users", get(routes::list_users))
            .route("/api/users/:user_id", get(routes::get_user))
            .with_state(AppState {
                dataset: Arc::clone(&self.dataset),
            });

        routes.layer(axum::middleware::from_fn_with_state(
            Arc::clone(&self.logger),
            middleware::log_requests,
        ))
    }

    /// Serve requests until the listener fails.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServiceError> {
        let router = self.router();
        axum::serve(listener, router)
            .await
            .map_err(ServiceError::Serve)
    }
}

/// Bind the shared worker listener for `addr`.
pub fn bind(addr: SocketAddr) -> Result<TcpListener, ServiceError> {
    platform::bind_shared_listener(addr, LISTEN_BACKLOG)
        .map_err(|source| ServiceError::Bind { addr, source })
}

/// Worker entry point: load, bind, serve.
pub async fn run_worker(
    config: &ServiceConfig,
    logger: Arc<dyn RequestLogger>,
) -> Result<(), ServiceError> {
    let dataset = Dataset::load(&config.dataset)?;
    debug!(users = dataset.len(), source = ?config.dataset, "dataset loaded");

    let listener = bind(config.addr)?;
    info!(
        pid = platform::current_pid(),
        addr = %config.addr,
        "Worker {} started",
        platform::current_pid()
    );

    Service::new(dataset, logger).serve(listener).await
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router: documentation page plus every mounted route
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind the server to a plain or TLS listener
//! - Stop accepting and drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::docs::DocsPage;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::tls::load_tls_config;
use crate::lifecycle::shutdown;
use crate::route::{mount, EnvSource};
use crate::routing::RouteTable;

/// Time allowed for in-flight requests once shutdown starts (TLS listener).
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP server for the redirect routes.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server from compiled routes.
    pub fn new(
        config: ServerConfig,
        table: Arc<RouteTable>,
        docs: DocsPage,
        env: Arc<dyn EnvSource>,
    ) -> Self {
        let router = Self::build_router(&config, table, docs, env);
        Self { router, config }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &ServerConfig,
        table: Arc<RouteTable>,
        docs: DocsPage,
        env: Arc<dyn EnvSource>,
    ) -> Router {
        docs.router(&config.documentation.path)
            .merge(mount(table, env))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let tls = self.config.tls.clone().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "TLS is not configured")
        })?;
        let rustls = load_tls_config(&tls).await?;

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown::wait(shutdown).await;
            drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Bind the configured address and serve until `shutdown` fires.
    pub async fn serve(self, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        if self.config.tls.is_some() {
            let addr: SocketAddr = self.config.address.parse().map_err(|err| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid listen address {:?}: {err}", self.config.address),
                )
            })?;
            return self.run_tls(addr, shutdown).await;
        }

        let listener = TcpListener::bind(&self.config.address).await?;
        self.run(listener, shutdown).await
    }
}

//! HTTP server exposing the registry to Prometheus.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{Router, get};
use eagle_metrics::MetricsRegistry;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::{ExporterError, ExporterResult};

/// Create the scrape router.
pub fn create_router(registry: MetricsRegistry) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health_check))
        .with_state(registry)
        .layer(TraceLayer::new_for_http())
}

async fn metrics(State(registry): State<MetricsRegistry>) -> Response {
    match registry.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, MetricsRegistry::content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Serves `/metrics` from a shared registry.
#[derive(Debug, Clone)]
pub struct MetricsServer {
    registry: MetricsRegistry,
}

impl MetricsServer {
    /// Create a server for `registry`.
    #[must_use]
    pub const fn new(registry: MetricsRegistry) -> Self {
        Self { registry }
    }

    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn bind(addr: SocketAddr) -> ExporterResult<TcpListener> {
        TcpListener::bind(addr)
            .await
            .map_err(|e| ExporterError::BindFailed(addr, e))
    }

    /// Serve on `listener` until the server encounters a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if the server stops unexpectedly.
    pub async fn serve(&self, listener: TcpListener) -> ExporterResult<()> {
        self.serve_with_shutdown(listener, std::future::pending())
            .await
    }

    /// Serve on `listener` until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the server stops unexpectedly.
    pub async fn serve_with_shutdown<F>(&self, listener: TcpListener, shutdown: F) -> ExporterResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, "metrics server listening");
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ExporterError::Server(e.to_string()))?;

        info!("metrics server shut down");
        Ok(())
    }

    /// Create the router without starting the server.
    pub fn router(&self) -> Router {
        create_router(self.registry.clone())
    }
}

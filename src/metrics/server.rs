//! Metrics HTTP Server
//!
//! Provides HTTP endpoint for Prometheus metrics scraping

use super::PrometheusSink;
use crate::Result;
use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

/// HTTP server for serving Prometheus metrics
pub struct MetricsServer {
    sink: Arc<PrometheusSink>,
    bind_addr: SocketAddr,
}

impl MetricsServer {
    /// Create a new metrics server
    pub fn new(sink: Arc<PrometheusSink>, bind_addr: SocketAddr) -> Self {
        Self { sink, bind_addr }
    }

    /// `/metrics`, `/health`, 404 for everything else
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .fallback(not_found_handler)
            .layer(CorsLayer::permissive())
            .with_state(self.sink.clone())
    }

    /// Bind and serve until a shutdown signal arrives
    pub async fn start(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind metrics server to {}", self.bind_addr))?;

        info!(bind_addr = %self.bind_addr, "Metrics server started");
        info!("Metrics available at http://{}/metrics", self.bind_addr);
        info!("Healthcheck available at http://{}/health", self.bind_addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                debug!("Metrics server received shutdown signal");
            })
            .await
            .context("Metrics server failed")?;

        info!("Metrics server stopped");
        Ok(())
    }
}

async fn metrics_handler(State(sink): State<Arc<PrometheusSink>>) -> impl IntoResponse {
    let body = sink.export_prometheus();
    debug!(bytes = body.len(), "Serving Prometheus metrics");
    ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body)
}

async fn health_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "OK")
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

//! HTTP server exposing the live metrics of a running engine.
//!
//! This module provides a small read-only HTTP surface for local consumers
//! such as a coaching UI or a dashboard:
//! - `GET /health` for liveness
//! - `GET /metrics` for the latest analytics record
//! - `GET /snapshot` for the latest full snapshot
//!
//! # Architecture
//!
//! ```text
//! FrameLoop ──→ watch channel ──→ server ──→ GET /metrics ──→ local UI
//! ```

use crate::core::{AnalyticsMetrics, MetricsSnapshot};
use axum::{extract::State, http::HeaderValue, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// Shared server state
pub struct ServerState {
    snapshots: watch::Receiver<MetricsSnapshot>,
}

impl ServerState {
    pub fn new(snapshots: watch::Receiver<MetricsSnapshot>) -> Self {
        Self { snapshots }
    }

    fn latest(&self) -> MetricsSnapshot {
        self.snapshots.borrow().clone()
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics
async fn metrics(State(state): State<Arc<ServerState>>) -> Json<AnalyticsMetrics> {
    Json(state.latest().analytics())
}

/// GET /snapshot
async fn snapshot(State(state): State<Arc<ServerState>>) -> Json<MetricsSnapshot> {
    Json(state.latest())
}

/// Build the router without binding it.
pub fn router(snapshots: watch::Receiver<MetricsSnapshot>) -> Router {
    let state = Arc::new(ServerState::new(snapshots));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/snapshot", get(snapshot))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    snapshots: watch::Receiver<MetricsSnapshot>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(snapshots);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Presence engine server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}

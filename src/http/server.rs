//! HTTP server exposing the arena
//!
//! Serves the voting API together with health and Prometheus endpoints on one
//! listener, with graceful shutdown driven by a broadcast channel.

use crate::http::handlers::{self, ApiState};
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Build the API router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/pair", get(handlers::pair_handler))
        .route("/vote", post(handlers::vote_handler))
        .route("/rankings", get(handlers::rankings_handler))
        .route("/admission", get(handlers::admission_handler))
        .route("/categories", get(handlers::categories_handler))
        .route("/entities/{id}/votes", get(handlers::history_handler))
        .route("/stats", get(handlers::stats_handler))
        .route("/health", get(handlers::health_handler))
        .route("/ready", get(handlers::ready_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state)
}

/// HTTP server for the voting API
pub struct ApiServer {
    addr: SocketAddr,
    state: ApiState,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, state: ApiState) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    /// Bind and serve until [`ApiServer::stop`] is called
    pub async fn start(&self) -> Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {}", self.addr))?;

        info!("HTTP API listening on http://{}", self.addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    pub fn stop(&self) {
        info!("Stopping HTTP server...");
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }
    }
}

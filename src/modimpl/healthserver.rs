use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::modimpl::healthstatus::{HealthStatus, HealthTracker};

pub fn router(health: Arc<HealthTracker>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .with_state(health)
}

async fn healthz(State(health): State<Arc<HealthTracker>>) -> (StatusCode, &'static str) {
    if health.is_healthy().await {
        (StatusCode::OK, "OK\n")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "NOT OK\n")
    }
}

async fn status(State(health): State<Arc<HealthTracker>>) -> Json<HealthStatus> {
    Json(health.snapshot().await)
}

async fn serve(addr: SocketAddr, health: Arc<HealthTracker>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind health check server to {}", addr))?;
    info!("💓 Starting health check server on {}", addr);
    axum::serve(listener, router(health))
        .await
        .context("Health check server stopped")
}

/// Serves the health endpoints for the lifetime of the process. Failing to
/// serve is logged but leaves the transfer loop running.
pub fn spawn(addr: SocketAddr, health: Arc<HealthTracker>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(addr, health).await {
            error!("Failed to start health check server: {:#}", e);
        }
    })
}

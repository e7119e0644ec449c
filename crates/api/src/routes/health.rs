use std::path::Path;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the configured mount root exists on this host.
    pub mount_root_present: bool,
}

/// GET /health -- returns service status and mount root presence.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let mount_root_present = Path::new(&state.config.mount_root).is_dir();

    let status = if mount_root_present { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        mount_root_present,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Browser-facing routes, mounted at the root.
///
/// ```text
/// /                    report page (GET, ?filter=)
/// /download            general-volume CSV (GET, ?filter=)
/// /refresh_mounts      credential-gated mount refresh (POST, JSON body)
/// ```
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::report::index))
        .route("/download", get(handlers::report::download))
        .route("/refresh_mounts", post(handlers::refresh::refresh_mounts))
}

/// Build the `/api/v1` route tree.
///
/// ```text
/// /report              categorized report as JSON (GET, ?filter=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/report", get(handlers::report::report_json))
}

//! Handlers for the report page, the CSV download and the JSON report.
//!
//! Every request takes a fresh usage snapshot; nothing is cached between
//! requests.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::Json;
use storemon_core::report::{build_report, general_csv, CategorizedReport, ReportView, CSV_FILENAME};
use storemon_core::snapshot::list_volumes;

use crate::error::AppResult;
use crate::query::FilterParams;
use crate::render::render_index;
use crate::response::DataResponse;
use crate::state::AppState;

/// Snapshot the mount root and classify it.
///
/// The snapshot issues blocking `statvfs` calls, so it runs on the
/// blocking pool.
async fn load_report(state: &AppState) -> AppResult<CategorizedReport> {
    let source = state.usage_source.clone();
    let mount_root = state.config.mount_root.clone();

    let volumes = tokio::task::spawn_blocking(move || list_volumes(&*source, &mount_root))
        .await??;

    tracing::debug!(volumes = volumes.len(), "Collected usage snapshot");

    Ok(build_report(volumes, &state.config.report))
}

/// GET /
///
/// Render the report page, optionally filtered by `?filter=`.
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> AppResult<Html<String>> {
    let report = load_report(&state).await?;
    let view = ReportView::build(&report, &params.mount_filter(), &state.config.report);
    Ok(Html(render_index(&view)))
}

/// GET /download
///
/// The filtered general group as a CSV attachment.
pub async fn download(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> AppResult<impl IntoResponse> {
    let report = load_report(&state).await?;
    let csv = general_csv(&report, &params.mount_filter())?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILENAME}\""),
            ),
        ],
        csv,
    ))
}

/// GET /api/v1/report
///
/// The same view model the page renders, as JSON.
pub async fn report_json(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> AppResult<Json<DataResponse<ReportView>>> {
    let report = load_report(&state).await?;
    let view = ReportView::build(&report, &params.mount_filter(), &state.config.report);
    Ok(Json(DataResponse { data: view }))
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use storemon_core::error::CoreError;
use tokio::task::JoinError;

/// Errors surfaced by the report endpoints.
///
/// Rendered as `{ "error", "code" }` JSON. Internal details are logged,
/// never sent to the client. The refresh endpoint has its own
/// `{ success, message }` body and does not use this type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The blocking snapshot task panicked or was cancelled.
    #[error("Snapshot task failed: {0}")]
    SnapshotTask(#[from] JoinError),
}

pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Core(CoreError::Validation(_)) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Core(CoreError::Internal(_)) | AppError::SnapshotTask(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Core(CoreError::Validation(msg)) => msg.clone(),
            other => {
                tracing::error!(error = %other, "Report request failed");
                INTERNAL_MESSAGE.to_string()
            }
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

//! Handler for the credential-gated mount refresh.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{Map, Value};
use storemon_core::refresh::{RefreshError, RefreshOutcome};

use crate::state::AppState;

const MISSING_CREDENTIALS: &str = "Missing username or password";

/// What a refresh request body carries.
#[derive(PartialEq, Eq)]
enum Credentials<'a> {
    /// Not a JSON object, or one of the two keys is absent.
    Missing,
    /// Both keys present with string values (possibly empty).
    Strings(&'a str, &'a str),
    /// Both keys present but at least one value is not a string.
    NonString,
}

/// Inspect a parsed body. Only key presence decides 400 vs. 401; any
/// present value is checked against the configured pair.
fn credentials(body: &Map<String, Value>) -> Credentials<'_> {
    match (body.get("username"), body.get("password")) {
        (Some(username), Some(password)) => match (username.as_str(), password.as_str()) {
            (Some(u), Some(p)) => Credentials::Strings(u, p),
            _ => Credentials::NonString,
        },
        _ => Credentials::Missing,
    }
}

/// POST /refresh_mounts
///
/// Always answers `{ success, message }`: 400 for an unparsable body or a
/// missing `username`/`password` key, 401 for wrong credentials, 500 when
/// the script fails or cannot run, 200 on success. The body is parsed by
/// hand so a bad body still gets that shape rather than axum's plain-text
/// rejection.
pub async fn refresh_mounts(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<RefreshOutcome>) {
    let body: Map<String, Value> = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, "Rejecting unparsable refresh request");
            return bad_request();
        }
    };

    let result = match credentials(&body) {
        Credentials::Missing => return bad_request(),
        Credentials::Strings(username, password) => {
            state.refresher.trigger(username, password).await
        }
        Credentials::NonString => {
            tracing::warn!("Mount refresh rejected -- non-string credentials");
            Err(RefreshError::InvalidCredentials)
        }
    };

    let status = match &result {
        Ok(()) => StatusCode::OK,
        Err(RefreshError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(RefreshOutcome::from(&result)))
}

fn bad_request() -> (StatusCode, Json<RefreshOutcome>) {
    (
        StatusCode::BAD_REQUEST,
        Json(RefreshOutcome::failed(MISSING_CREDENTIALS)),
    )
}

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use storemon_api::config::ServerConfig;
use storemon_api::router::build_app_router;
use storemon_api::state::AppState;
use storemon_core::refresh::RefreshConfig;
use storemon_core::report::ReportSettings;
use storemon_core::snapshot::{MountEntry, RawUsage, UsageSource};

/// One decimal terabyte in bytes.
pub const TB: u64 = 1_000_000_000_000;

// ---------------------------------------------------------------------------
// Fixture usage source
// ---------------------------------------------------------------------------

/// In-memory mount table. Mounts registered with [`FixtureSource::denied`]
/// fail their usage query with `PermissionDenied`.
#[derive(Default)]
pub struct FixtureSource {
    mounts: Vec<MountEntry>,
    usage: HashMap<String, RawUsage>,
    broken_table: bool,
}

impl FixtureSource {
    /// Add a mount with capacities given in tenths of a TB.
    pub fn mount(mut self, mountpoint: &str, total_dtb: u64, used_dtb: u64) -> Self {
        self.push_entry(mountpoint);
        self.usage.insert(
            mountpoint.to_string(),
            RawUsage {
                total_bytes: total_dtb * TB / 10,
                used_bytes: used_dtb * TB / 10,
                free_bytes: (total_dtb - used_dtb) * TB / 10,
            },
        );
        self
    }

    pub fn denied(mut self, mountpoint: &str) -> Self {
        self.push_entry(mountpoint);
        self
    }

    /// Make reading the mount table itself fail.
    pub fn broken() -> Self {
        Self {
            broken_table: true,
            ..Self::default()
        }
    }

    fn push_entry(&mut self, mountpoint: &str) {
        self.mounts.push(MountEntry {
            device: format!("nas:{mountpoint}"),
            mountpoint: mountpoint.to_string(),
            fs_type: "cifs".to_string(),
        });
    }
}

impl UsageSource for FixtureSource {
    fn mounts(&self) -> io::Result<Vec<MountEntry>> {
        if self.broken_table {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no mount table"));
        }
        Ok(self.mounts.clone())
    }

    fn usage(&self, mountpoint: &str) -> io::Result<RawUsage> {
        self.usage
            .get(mountpoint)
            .copied()
            .ok_or_else(|| io::Error::from(io::ErrorKind::PermissionDenied))
    }
}

/// The worked example: one curator, one raysync, one excluded raysync
/// root and one near-full general volume.
pub fn example_source() -> FixtureSource {
    FixtureSource::default()
        .mount("/mnt/AMS01", 100, 90)
        .mount("/mnt/PMC_RAYSYNC_ROOT", 50, 10)
        .mount("/mnt/PMC_RAYSYNC_A", 40, 38)
        .mount("/mnt/GEN1", 20, 19)
        .mount("/boot", 10, 1)
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
///
/// Refresh is left unconfigured (every attempt is rejected).
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:7443".to_string()],
        request_timeout_secs: 30,
        mount_root: "/mnt/".to_string(),
        report: ReportSettings::default(),
        refresh: RefreshConfig::default(),
    }
}

/// Refresh settings that run `body` as a bash script from `work`, with
/// credential files created in `cred_dir`. Accepts `operator`/`s3cret`.
pub fn bash_refresh_config(body: &str, work: &Path, cred_dir: &Path) -> RefreshConfig {
    let script = work.join("auto_mount.sh");
    std::fs::write(&script, format!("#!/bin/bash\n{body}")).expect("write script");

    RefreshConfig {
        username: "operator".to_string(),
        password: "s3cret".to_string(),
        script_dir: work.to_path_buf(),
        script: script.to_str().expect("utf-8 path").to_string(),
        elevate: vec!["bash".to_string()],
        timeout: Duration::from_secs(5),
        credential_dir: Some(cred_dir.to_path_buf()),
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(config: ServerConfig, source: FixtureSource) -> Router {
    let state = AppState::new(config.clone(), Arc::new(source));
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request / response helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    app.oneshot(request).await.expect("request failed")
}

pub async fn post_raw(app: Router, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    app.oneshot(request).await.expect("request failed")
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    post_raw(app, uri, &body.to_string()).await
}

pub async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let text = body_text(response).await;
    serde_json::from_str(&text).expect("json body")
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use storemon_core::critical::DEFAULT_CRITICAL_THRESHOLD;
use storemon_core::refresh::{RefreshConfig, DEFAULT_REFRESH_TIMEOUT};
use storemon_core::report::{ReportSettings, DEFAULT_FLEET_CAPACITY_TB};

/// Default namespace under which storage volumes are mounted.
pub const DEFAULT_MOUNT_ROOT: &str = "/mnt/";

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for a single storage host; override
/// via environment variables (or a `.env` file).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `7443`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds. Must outlast the refresh timeout.
    pub request_timeout_secs: u64,
    /// Only mounts whose path starts with this prefix are reported.
    pub mount_root: String,
    /// Fleet capacity and critical threshold.
    pub report: ReportSettings,
    /// Mount-refresh credentials and script location.
    pub refresh: RefreshConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                    |
    /// |--------------------------|----------------------------|
    /// | `HOST`                   | `0.0.0.0`                  |
    /// | `PORT`                   | `7443`                     |
    /// | `CORS_ORIGINS`           | `http://localhost:7443`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `330`                      |
    /// | `MOUNT_ROOT`             | `/mnt/`                    |
    /// | `FLEET_CAPACITY_TB`      | `2304.763289`              |
    /// | `CRITICAL_THRESHOLD_PCT` | `91`                       |
    /// | `REFRESH_USERNAME`       | empty (refresh disabled)   |
    /// | `REFRESH_PASSWORD`       | empty                      |
    /// | `REFRESH_SCRIPT_DIR`     | `/scripts`                 |
    /// | `REFRESH_SCRIPT`         | `./auto_mount_smb.sh`      |
    /// | `REFRESH_ELEVATE`        | `sudo -S`                  |
    /// | `REFRESH_TIMEOUT_SECS`   | `300`                      |
    /// | `REFRESH_CREDENTIAL_DIR` | system temp dir            |
    ///
    /// Panics on unparsable numeric values so misconfiguration fails fast.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_env("PORT", 7443);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:7443".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_env("REQUEST_TIMEOUT_SECS", 330);

        let mount_root =
            std::env::var("MOUNT_ROOT").unwrap_or_else(|_| DEFAULT_MOUNT_ROOT.into());

        let report = ReportSettings {
            fleet_capacity_tb: parse_env("FLEET_CAPACITY_TB", DEFAULT_FLEET_CAPACITY_TB),
            critical_threshold: parse_env("CRITICAL_THRESHOLD_PCT", DEFAULT_CRITICAL_THRESHOLD),
        };

        if let Err(e) = report.validate() {
            panic!("Invalid report configuration: {e}");
        }

        let defaults = RefreshConfig::default();
        let elevate = match std::env::var("REFRESH_ELEVATE") {
            Ok(raw) => raw.split_whitespace().map(str::to_string).collect(),
            Err(_) => defaults.elevate,
        };
        let refresh = RefreshConfig {
            username: std::env::var("REFRESH_USERNAME").unwrap_or_default(),
            password: std::env::var("REFRESH_PASSWORD").unwrap_or_default(),
            script_dir: std::env::var("REFRESH_SCRIPT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.script_dir),
            script: std::env::var("REFRESH_SCRIPT").unwrap_or(defaults.script),
            elevate,
            timeout: Duration::from_secs(parse_env(
                "REFRESH_TIMEOUT_SECS",
                DEFAULT_REFRESH_TIMEOUT.as_secs(),
            )),
            credential_dir: std::env::var("REFRESH_CREDENTIAL_DIR").ok().map(PathBuf::from),
        };

        if refresh.username.is_empty() {
            tracing::warn!("REFRESH_USERNAME not set -- mount refresh requests will be rejected");
        }

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            mount_root,
            report,
            refresh,
        }
    }
}

/// Read `key` and parse it, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

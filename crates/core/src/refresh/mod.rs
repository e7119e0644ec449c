//! Privileged mount-refresh trigger.
//!
//! [`MountRefresher`] checks a credential pair against the configured one
//! and, on a match, runs the refresh script behind an elevation command
//! (`sudo -S` by default). The password reaches the elevation command on
//! stdin through a temporary file that exists only for the duration of
//! the call; [`tempfile::NamedTempFile`] removes it on every exit path.

pub mod subprocess;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::process::Command;

/// Message returned when the script exits cleanly.
pub const REFRESH_SUCCESS_MESSAGE: &str = "Volume mounts refreshed successfully";

/// Default wall-clock limit for the refresh script.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors from a refresh attempt.
///
/// The `Display` text doubles as the user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Error refreshing mounts: {stderr}")]
    ScriptFailed { exit_code: i32, stderr: String },

    #[error("Error: mount refresh timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Error: {0}")]
    Io(#[from] std::io::Error),
}

/// `{ success, message }` result reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub success: bool,
    pub message: String,
}

impl RefreshOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            message: REFRESH_SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<&Result<(), RefreshError>> for RefreshOutcome {
    fn from(result: &Result<(), RefreshError>) -> Self {
        match result {
            Ok(()) => Self::succeeded(),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// Where and how the refresh script runs, and who may trigger it.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Expected username. An empty value rejects every attempt.
    pub username: String,
    /// Expected password.
    pub password: String,
    /// Working directory for the script.
    pub script_dir: PathBuf,
    /// Script path, relative to `script_dir` or absolute.
    pub script: String,
    /// Elevation command and its arguments, run with the script appended.
    /// Empty runs the script directly.
    pub elevate: Vec<String>,
    /// Maximum time the script may run before it is killed.
    pub timeout: Duration,
    /// Directory for the temporary credential file (system temp dir if `None`).
    pub credential_dir: Option<PathBuf>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            script_dir: PathBuf::from("/scripts"),
            script: "./auto_mount_smb.sh".to_string(),
            elevate: vec!["sudo".to_string(), "-S".to_string()],
            timeout: DEFAULT_REFRESH_TIMEOUT,
            credential_dir: None,
        }
    }
}

impl RefreshConfig {
    /// Whether `username`/`password` match the configured pair.
    pub fn accepts(&self, username: &str, password: &str) -> bool {
        !self.username.is_empty() && username == self.username && password == self.password
    }
}

/// Runs the mount-refresh script on behalf of authenticated callers.
///
/// Concurrent calls are not serialized; each one owns its own credential
/// file.
#[derive(Debug, Clone)]
pub struct MountRefresher {
    config: RefreshConfig,
}

impl MountRefresher {
    pub fn new(config: RefreshConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Check credentials and run the refresh script.
    ///
    /// Returns [`RefreshError::InvalidCredentials`] without side effects on
    /// a mismatch, [`RefreshError::ScriptFailed`] with captured stderr on a
    /// non-zero exit, and [`RefreshError::Timeout`] when the script (or
    /// anything it left holding its output) overruns the limit, after the
    /// whole process group has been terminated.
    pub async fn trigger(&self, username: &str, password: &str) -> Result<(), RefreshError> {
        if !self.config.accepts(username, password) {
            tracing::warn!(username, "Mount refresh rejected -- invalid credentials");
            return Err(RefreshError::InvalidCredentials);
        }

        tracing::info!(username, script = %self.config.script, "Starting mount refresh");

        let credential = self.write_credential_file(password)?;
        let stdin = credential.reopen()?;
        let mut cmd = self.build_command();

        let result = subprocess::run_with_stdin(&mut cmd, stdin, self.config.timeout).await;
        drop(credential);

        let output = result.inspect_err(|e| {
            tracing::error!(error = %e, "Mount refresh could not complete");
        })?;

        if output.exit_code != 0 {
            tracing::error!(
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                "Mount refresh script failed"
            );
            return Err(RefreshError::ScriptFailed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        tracing::info!(duration_ms = output.duration_ms, "Mount refresh completed");
        Ok(())
    }

    /// Create an owner-only temp file holding `password` and a newline.
    fn write_credential_file(&self, password: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("storemon-cred-");
        let mut file = match &self.config.credential_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        writeln!(file, "{password}")?;
        file.flush()?;
        Ok(file)
    }

    fn build_command(&self) -> Command {
        let mut cmd = match self.config.elevate.split_first() {
            Some((program, args)) => {
                let mut cmd = Command::new(program);
                cmd.args(args).arg(&self.config.script);
                cmd
            }
            None => Command::new(&self.config.script),
        };
        cmd.current_dir(&self.config.script_dir);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;

    use super::*;

    /// Refresher that runs `body` through `bash`, with credential files
    /// created inside `cred_dir`.
    fn refresher_for(body: &str, work: &Path, cred_dir: &Path) -> MountRefresher {
        let script = work.join("refresh.sh");
        std::fs::write(&script, format!("#!/bin/bash\n{body}")).expect("write script");

        MountRefresher::new(RefreshConfig {
            username: "operator".to_string(),
            password: "s3cret".to_string(),
            script_dir: work.to_path_buf(),
            script: script.to_str().expect("utf-8 path").to_string(),
            elevate: vec!["bash".to_string()],
            timeout: Duration::from_secs(5),
            credential_dir: Some(cred_dir.to_path_buf()),
        })
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).expect("read dir").count()
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_without_side_effects() {
        let work = tempfile::tempdir().expect("work dir");
        let creds = tempfile::tempdir().expect("cred dir");
        let marker = work.path().join("ran");
        let refresher = refresher_for(&format!("touch {}\n", marker.display()), work.path(), creds.path());

        let result = refresher.trigger("operator", "wrong").await;

        assert_matches!(result, Err(RefreshError::InvalidCredentials));
        assert!(!marker.exists(), "script must not run");
        assert_eq!(file_count(creds.path()), 0);
    }

    #[tokio::test]
    async fn password_reaches_script_on_stdin() {
        let work = tempfile::tempdir().expect("work dir");
        let creds = tempfile::tempdir().expect("cred dir");
        let refresher = refresher_for(
            "read -r pw\n[ \"$pw\" = \"s3cret\" ] || exit 3\n",
            work.path(),
            creds.path(),
        );

        let result = refresher.trigger("operator", "s3cret").await;

        assert_matches!(result, Ok(()));
        assert_eq!(file_count(creds.path()), 0, "credential file must be removed");
    }

    #[tokio::test]
    async fn script_runs_in_configured_directory() {
        let work = tempfile::tempdir().expect("work dir");
        let creds = tempfile::tempdir().expect("cred dir");
        let refresher = refresher_for("touch ./here\n", work.path(), creds.path());

        refresher.trigger("operator", "s3cret").await.expect("refresh");

        assert!(work.path().join("here").exists());
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr_and_cleans_up() {
        let work = tempfile::tempdir().expect("work dir");
        let creds = tempfile::tempdir().expect("cred dir");
        let refresher = refresher_for("echo 'mount error 13' >&2\nexit 1\n", work.path(), creds.path());

        let result = refresher.trigger("operator", "s3cret").await;

        assert_matches!(
            &result,
            Err(RefreshError::ScriptFailed { exit_code: 1, stderr }) if stderr.contains("mount error 13")
        );
        let outcome = RefreshOutcome::from(&result);
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Error refreshing mounts: mount error 13\n");
        assert_eq!(file_count(creds.path()), 0);
    }

    #[tokio::test]
    async fn overrunning_script_times_out_and_cleans_up() {
        let work = tempfile::tempdir().expect("work dir");
        let creds = tempfile::tempdir().expect("cred dir");
        let mut refresher = refresher_for("exec sleep 30\n", work.path(), creds.path());
        refresher.config.timeout = Duration::from_millis(200);

        let result = refresher.trigger("operator", "s3cret").await;

        assert_matches!(result, Err(RefreshError::Timeout { .. }));
        assert_eq!(file_count(creds.path()), 0);
    }

    #[tokio::test]
    async fn background_child_does_not_extend_deadline() {
        let work = tempfile::tempdir().expect("work dir");
        let creds = tempfile::tempdir().expect("cred dir");
        let mut refresher = refresher_for("sleep 4 &\nexit 0\n", work.path(), creds.path());
        refresher.config.timeout = Duration::from_millis(500);
        let start = std::time::Instant::now();

        let result = refresher.trigger("operator", "s3cret").await;

        assert_matches!(result, Err(RefreshError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());
        assert_eq!(file_count(creds.path()), 0);
    }

    #[tokio::test]
    async fn timeout_stops_script_behind_elevation_wrapper() {
        let work = tempfile::tempdir().expect("work dir");
        let creds = tempfile::tempdir().expect("cred dir");
        let mut refresher = refresher_for("sleep 1\ntouch ./still_ran\n", work.path(), creds.path());
        // Stands in for `sudo -S`: the script runs as a grandchild.
        refresher.config.elevate = vec![
            "bash".to_string(),
            "-c".to_string(),
            "bash \"$0\" >/dev/null 2>&1".to_string(),
        ];
        refresher.config.timeout = Duration::from_millis(300);

        let result = refresher.trigger("operator", "s3cret").await;
        assert_matches!(result, Err(RefreshError::Timeout { .. }));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!work.path().join("still_ran").exists(), "script outlived the timeout");
    }

    #[tokio::test]
    async fn missing_script_is_io_error_and_cleans_up() {
        let work = tempfile::tempdir().expect("work dir");
        let creds = tempfile::tempdir().expect("cred dir");
        let mut refresher = refresher_for("", work.path(), creds.path());
        refresher.config.elevate.clear();
        refresher.config.script = "/nonexistent/auto_mount.sh".to_string();

        let result = refresher.trigger("operator", "s3cret").await;

        assert_matches!(result, Err(RefreshError::Io(_)));
        assert!(RefreshOutcome::from(&result).message.starts_with("Error: "));
        assert_eq!(file_count(creds.path()), 0);
    }

    #[tokio::test]
    async fn unconfigured_username_rejects_everything() {
        let refresher = MountRefresher::new(RefreshConfig::default());
        let result = refresher.trigger("", "").await;
        assert_matches!(result, Err(RefreshError::InvalidCredentials));
    }

    #[test]
    fn success_outcome_message() {
        let outcome = RefreshOutcome::from(&Ok::<(), RefreshError>(()));
        assert!(outcome.success);
        assert_eq!(outcome.message, REFRESH_SUCCESS_MESSAGE);
    }

    #[test]
    fn default_command_elevates_with_sudo() {
        let refresher = MountRefresher::new(RefreshConfig::default());
        let cmd = refresher.build_command();
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "sudo");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, ["-S", "./auto_mount_smb.sh"]);
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/scripts")));
    }
}

//! Child process execution for the mount-refresh script.
//!
//! [`run_with_stdin`] spawns a prepared [`Command`] in its own process
//! group with a file attached as stdin, captures stdout/stderr, and
//! enforces one wall-clock deadline over the child and both output
//! readers. On expiry the whole group is terminated.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use super::RefreshError;

/// Maximum stdout or stderr size captured per stream (1 MiB).
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Time between SIGTERM and SIGKILL when a timed-out group is torn down.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Spawn `cmd` with `stdin` attached, wait at most `timeout`, and capture
/// its output.
///
/// The deadline covers the child's exit and the draining of both pipes,
/// so a background process that inherits stdout or stderr cannot hold
/// the call open. On expiry the child's process group receives SIGTERM,
/// then SIGKILL after [`TERMINATE_GRACE`], and [`RefreshError::Timeout`]
/// is returned.
pub async fn run_with_stdin(
    cmd: &mut Command,
    stdin: std::fs::File,
    timeout: Duration,
) -> Result<ProcessOutput, RefreshError> {
    cmd.stdin(Stdio::from(stdin))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn()?;
    // With `process_group(0)` the child's pid is also its group id.
    let pgid = child.id();

    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));
    let stdout_abort = stdout_task.abort_handle();
    let stderr_abort = stderr_task.abort_handle();

    let run = async {
        let status = child.wait().await?;
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        Ok::<(ExitStatus, Vec<u8>, Vec<u8>), std::io::Error>((status, stdout, stderr))
    };

    let outcome = tokio::time::timeout(timeout, run).await;
    match outcome {
        Ok(Ok((status, stdout, stderr))) => Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code().unwrap_or(-1),
            duration_ms: start.elapsed().as_millis() as u64,
        }),
        Ok(Err(e)) => Err(RefreshError::Io(e)),
        Err(_elapsed) => {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            tracing::warn!(
                elapsed_ms,
                pgid = ?pgid,
                "Refresh process overran its deadline -- terminating group"
            );
            terminate_group(&mut child, pgid).await;
            stdout_abort.abort();
            stderr_abort.abort();
            Err(RefreshError::Timeout { elapsed_ms })
        }
    }
}

/// SIGTERM the process group, give it [`TERMINATE_GRACE`] to exit, then
/// SIGKILL whatever is left and reap the direct child.
async fn terminate_group(child: &mut Child, pgid: Option<u32>) {
    signal_group(pgid, libc::SIGTERM);
    let _ = tokio::time::timeout(TERMINATE_GRACE, child.wait()).await;
    signal_group(pgid, libc::SIGKILL);
    let _ = child.start_kill();
    let _ = child.wait().await;
}

fn signal_group(pgid: Option<u32>, signal: libc::c_int) {
    let Some(pgid) = pgid else {
        return;
    };
    // ESRCH (group already gone) is expected and ignored.
    // SAFETY: killpg has no memory-safety preconditions.
    unsafe {
        libc::killpg(pgid as libc::pid_t, signal);
    }
}

/// Read an entire output stream, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

#[cfg(test)]
mod tests {
    use std::io::{Seek, Write};

    use super::*;

    fn stdin_with(content: &str) -> std::fs::File {
        let mut f = tempfile::tempfile().expect("create temp file");
        f.write_all(content.as_bytes()).expect("write stdin");
        f.rewind().expect("rewind");
        f
    }

    #[tokio::test]
    async fn captures_stdout_from_stdin_file() {
        let mut cmd = Command::new("cat");
        let out = run_with_stdin(&mut cmd, stdin_with("hello\n"), Duration::from_secs(5))
            .await
            .expect("run");
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout, "hello\n");
    }

    #[tokio::test]
    async fn captures_stderr_and_exit_code() {
        let mut cmd = Command::new("bash");
        cmd.args(["-c", "echo oops >&2; exit 7"]);
        let out = run_with_stdin(&mut cmd, stdin_with(""), Duration::from_secs(5))
            .await
            .expect("run");
        assert_eq!(out.exit_code, 7);
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn times_out_long_running_process() {
        let mut cmd = Command::new("bash");
        cmd.args(["-c", "exec sleep 30"]);
        let result = run_with_stdin(&mut cmd, stdin_with(""), Duration::from_millis(200)).await;
        assert!(matches!(result, Err(RefreshError::Timeout { .. })));
    }

    #[tokio::test]
    async fn background_process_holding_pipes_hits_deadline() {
        let mut cmd = Command::new("bash");
        cmd.args(["-c", "sleep 4 &\nexit 0"]);
        let start = Instant::now();

        let result = run_with_stdin(&mut cmd, stdin_with(""), Duration::from_millis(300)).await;

        assert!(matches!(result, Err(RefreshError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());
    }

    #[tokio::test]
    async fn timeout_kills_grandchildren() {
        let dir = tempfile::tempdir().expect("temp dir");
        let marker = dir.path().join("still_ran");
        let mut cmd = Command::new("bash");
        cmd.args([
            "-c",
            "bash -c \"sleep 1; touch \\\"$0\\\"\" \"$1\" >/dev/null 2>&1",
            "outer",
        ])
        .arg(&marker);

        let result = run_with_stdin(&mut cmd, stdin_with(""), Duration::from_millis(200)).await;
        assert!(matches!(result, Err(RefreshError::Timeout { .. })));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "grandchild outlived the timeout");
    }

    #[tokio::test]
    async fn missing_program_is_io_error() {
        let mut cmd = Command::new("/nonexistent/refresh-program");
        let result = run_with_stdin(&mut cmd, stdin_with(""), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(RefreshError::Io(_))));
    }
}

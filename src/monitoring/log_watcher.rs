//! Log file follower for the monitoring pipeline
//!
//! Follows the watched files through `tail -n 0 -F`, which keeps reading
//! across truncation and rotation and only yields lines appended after the
//! watch begins.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::utils::AppError;

/// How long to wait for the follow process to exit after it is killed
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Source of raw log lines, owned exclusively by the pipeline driver
#[async_trait]
pub trait LineSource: Send {
    /// Wait for the next line.
    ///
    /// `Ok(None)` means the source has ended and will not produce more lines.
    async fn next_line(&mut self) -> Result<Option<String>, AppError>;

    /// Release the underlying resource. Safe to call more than once.
    async fn close(&mut self);
}

/// Check if `tail` is available on this system
///
/// Uses only POSIX options so GNU, BusyBox and BSD builds all pass.
pub fn tail_available() -> bool {
    std::process::Command::new("tail")
        .args(["-n", "0", "/dev/null"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Follows files with a `tail -F` child process
pub struct TailFollower {
    child: Child,
    reader: BufReader<ChildStdout>,
    buf: Vec<u8>,
    closed: bool,
}

impl TailFollower {
    /// Start following `paths` from their current end
    pub fn spawn(paths: &[PathBuf]) -> Result<Self, AppError> {
        let mut command = Command::new("tail");
        command.args(["-n", "0", "-F"]).args(paths);

        let follower = Self::from_command(command)?;
        info!(
            files = %paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "),
            "Watching files"
        );
        Ok(follower)
    }

    /// Read lines from the stdout of an arbitrary follow command
    pub fn from_command(mut command: Command) -> Result<Self, AppError> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::SourceSpawn(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::SourceSpawn("Failed to capture follow process stdout".to_string()))?;

        Ok(Self {
            child,
            reader: BufReader::new(stdout),
            buf: Vec::new(),
            closed: false,
        })
    }
}

#[async_trait]
impl LineSource for TailFollower {
    async fn next_line(&mut self) -> Result<Option<String>, AppError> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|e| AppError::source_io(e.to_string()))?;

            if read == 0 {
                return Ok(None);
            }

            // Log files are not guaranteed to be valid UTF-8
            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim_end_matches(['\n', '\r']);

            if is_tail_header(line) {
                debug!(header = %line, "Skipping tail file header");
                continue;
            }

            return Ok(Some(line.to_string()));
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.child.start_kill() {
            // Already exited
            debug!(error = %e, "Follow process kill skipped");
        }

        match tokio::time::timeout(CLOSE_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => info!(status = %status, "Follow process stopped"),
            Ok(Err(e)) => warn!(error = %e, "Failed to reap follow process"),
            Err(_) => warn!("Follow process did not exit in time"),
        }
    }
}

/// `tail` prints `==> path <==` when it switches between files
fn is_tail_header(line: &str) -> bool {
    line.starts_with("==> ") && line.ends_with(" <==")
}

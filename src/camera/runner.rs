//! Invocation of the camera executables (still capture, recorder, transcoder).

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command};
use tokio_util::sync::CancellationToken;

use super::errors::RunnerError;

/// How a recorder process ended without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordExit {
    /// Killed because the cancellation token fired.
    Cancelled,
    /// Exited on its own with a success status (duration bound reached).
    Completed,
}

/// The external capability the coordinator drives the camera through.
#[async_trait]
pub trait CameraRunner: Send + Sync {
    /// Takes a still picture and returns the encoded bytes.
    async fn capture(&self) -> Result<Vec<u8>, RunnerError>;

    /// Records into `output` until `cancel` fires or `max_duration` elapses.
    /// Resolves only once the process has terminated.
    async fn record(
        &self,
        cancel: CancellationToken,
        output: PathBuf,
        max_duration: Duration,
    ) -> Result<RecordExit, RunnerError>;

    /// Converts the raw recording at `input` into the delivery container.
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), RunnerError>;
}

/// A program plus the arguments placed before the tool-specific ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }
}

/// Runs the raspistill / raspivid / MP4Box family of tools as child processes.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    still: ToolCommand,
    video: ToolCommand,
    transcoder: ToolCommand,
}

impl CommandRunner {
    pub fn new(still: ToolCommand, video: ToolCommand, transcoder: ToolCommand) -> Self {
        Self {
            still,
            video,
            transcoder,
        }
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(
            ToolCommand::new("raspistill"),
            ToolCommand::new("raspivid"),
            ToolCommand::new("MP4Box"),
        )
    }
}

#[async_trait]
impl CameraRunner for CommandRunner {
    async fn capture(&self) -> Result<Vec<u8>, RunnerError> {
        let program = &self.still.program;
        tracing::debug!(target: "camera", "[RUNNER] Capturing still with {}", program);

        let output = self
            .still
            .command()
            .args(["-o", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RunnerError::spawn(program, e))?;

        check_status(program, output.status, &output.stderr)?;
        Ok(output.stdout)
    }

    async fn record(
        &self,
        cancel: CancellationToken,
        output: PathBuf,
        max_duration: Duration,
    ) -> Result<RecordExit, RunnerError> {
        let program = &self.video.program;
        let timeout_ms = max_duration.as_millis().to_string();

        let mut child = self
            .video
            .command()
            .arg("-o")
            .arg(&output)
            .arg("-t")
            .arg(&timeout_ms)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunnerError::spawn(program, e))?;

        tracing::info!(target: "camera",
            "[RUNNER] {} recording to {:?} (pid {:?}, bound {:?})",
            program, output, child.id(), max_duration);

        // Drained concurrently so a chatty recorder cannot fill the pipe.
        let stderr = child.stderr.take().map(|pipe| tokio::spawn(drain(pipe)));

        let status = exit_or_cancel(child.wait(), &cancel).await;

        let Some(status) = status else {
            if let Err(e) = child.kill().await {
                tracing::warn!(target: "camera", "[RUNNER] Failed to kill {}: {}", program, e);
            }
            tracing::info!(target: "camera", "[RUNNER] {} stopped by cancellation", program);
            return Ok(RecordExit::Cancelled);
        };

        let status = status.map_err(|e| RunnerError::wait(program, e))?;
        let stderr = match stderr {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };
        check_status(program, status, &stderr)?;

        tracing::info!(target: "camera", "[RUNNER] {} exited on its own", program);
        Ok(RecordExit::Completed)
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), RunnerError> {
        let program = &self.transcoder.program;
        tracing::debug!(target: "camera", "[RUNNER] Transcoding {:?} -> {:?}", input, output);

        let result = self
            .transcoder
            .command()
            .arg("-add")
            .arg(input)
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RunnerError::spawn(program, e))?;

        check_status(program, result.status, &result.stderr)
    }
}

/// Waits for `exit`, or returns `None` once `cancel` fires. An exit that is
/// already ready wins over a cancel fired at the same time.
async fn exit_or_cancel<F>(exit: F, cancel: &CancellationToken) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        output = exit => Some(output),
        _ = cancel.cancelled() => None,
    }
}

async fn drain(mut pipe: ChildStderr) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf).await;
    buf
}

fn check_status(program: &str, status: ExitStatus, stderr: &[u8]) -> Result<(), RunnerError> {
    if status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    tracing::error!(target: "camera", "[RUNNER] {} failed ({}): {}", program, status, stderr);

    Err(RunnerError::ProcessFailed {
        program: program.to_string(),
        exit_code: status.code(),
        stderr,
    })
}

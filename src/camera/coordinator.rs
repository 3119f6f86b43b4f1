//! CameraCoordinator - drives capture and the record/stop/transcode lifecycle.
//!
//! Every operation first wins a transition from the `StateGuard`; only then
//! does it touch the runner. The session slot is locked before the guard by
//! both start and stop, so a stop can never observe Recording while a start
//! is still settling.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use super::errors::{CameraError, GuardRejection};
use super::runner::{CameraRunner, RecordExit};
use super::state::{CameraState, StateGuard};
use super::RecordingSession;

pub const RAW_VIDEO_FILE: &str = "vid.h264";
pub const OUTPUT_VIDEO_FILE: &str = "vid.mp4";

pub const DEFAULT_MAX_RECORD_DURATION: Duration = Duration::from_secs(10);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Directory holding the raw and transcoded video artifacts.
    pub work_dir: PathBuf,
    /// Safety bound handed to the recorder.
    pub max_record_duration: Duration,
    /// Wait after launching or signalling the recorder.
    pub settle_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            max_record_duration: DEFAULT_MAX_RECORD_DURATION,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

pub struct CameraCoordinator {
    guard: StateGuard,
    runner: Arc<dyn CameraRunner>,
    session: Mutex<Option<RecordingSession>>,
    config: CoordinatorConfig,
}

impl CameraCoordinator {
    pub fn new(runner: Arc<dyn CameraRunner>, config: CoordinatorConfig) -> Self {
        Self {
            guard: StateGuard::new(),
            runner,
            session: Mutex::new(None),
            config,
        }
    }

    pub fn status(&self) -> CameraState {
        self.guard.current()
    }

    pub fn raw_video_path(&self) -> PathBuf {
        self.config.work_dir.join(RAW_VIDEO_FILE)
    }

    pub fn output_video_path(&self) -> PathBuf {
        self.config.work_dir.join(OUTPUT_VIDEO_FILE)
    }

    /// Takes a still picture. The camera is Free again when this returns.
    pub async fn capture(&self) -> Result<Vec<u8>, CameraError> {
        let _lease = self.guard.acquire(CameraState::Capturing)?;

        let picture = self.runner.capture().await?;
        tracing::info!(target: "camera", "[COORDINATOR] Captured picture ({} bytes)", picture.len());

        Ok(picture)
    }

    /// Launches the recorder and returns once it has survived the settle delay.
    pub async fn start_recording(&self) -> Result<(), CameraError> {
        let mut slot = self.session.lock().await;
        let lease = self.guard.acquire(CameraState::Recording)?;

        let raw_path = self.raw_video_path();
        remove_stale(&raw_path).await;

        let cancel = CancellationToken::new();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let runner = Arc::clone(&self.runner);
        let task_cancel = cancel.clone();
        let task_path = raw_path.clone();
        let max_duration = self.config.max_record_duration;
        tokio::spawn(async move {
            let outcome = runner.record(task_cancel, task_path, max_duration).await;
            let _ = outcome_tx.send(outcome);
        });

        let mut session = RecordingSession::new(raw_path, cancel, outcome_rx);

        tokio::time::sleep(self.config.settle_delay).await;

        // `lease` drops on these returns, freeing the camera.
        if let Some(outcome) = session.try_outcome() {
            tracing::warn!(target: "camera",
                "[COORDINATOR] Recorder exited during start: {:?}", outcome);
            return Err(match outcome {
                Ok(_) => CameraError::RecorderExitedEarly(self.config.settle_delay),
                Err(e) => e.into(),
            });
        }

        tracing::info!(target: "camera",
            "[COORDINATOR] Recording started: session={}, raw={:?}",
            session.id, session.raw_path());

        *slot = Some(session);
        lease.keep();
        Ok(())
    }

    /// Stops the recorder, waits for it to terminate and transcodes the result.
    /// Returns the path of the delivery file.
    pub async fn stop_recording(&self) -> Result<PathBuf, CameraError> {
        let (_lease, mut session) = {
            let mut slot = self.session.lock().await;
            let lease = self.guard.acquire(CameraState::Stopping)?;
            debug_assert!(self.guard.current().has_session());
            let Some(session) = slot.take() else {
                tracing::error!(target: "camera", "[COORDINATOR] Stopping without a session");
                return Err(GuardRejection::NotRecording.into());
            };
            (lease, session)
        };

        tracing::info!(target: "camera", "[COORDINATOR] Stopping session={}", session.id);
        session.cancel();
        tokio::time::sleep(self.config.settle_delay).await;

        match session.outcome().await {
            Ok(RecordExit::Cancelled) => {}
            Ok(RecordExit::Completed) => {
                tracing::info!(target: "camera",
                    "[COORDINATOR] Recorder reached its duration bound before stop");
            }
            Err(e) => {
                tracing::error!(target: "camera", "[COORDINATOR] Recorder died abnormally: {}", e);
                return Err(CameraError::UnexpectedStop(e));
            }
        }

        let output = self.output_video_path();
        remove_stale(&output).await;

        self.runner.transcode(session.raw_path(), &output).await?;
        tracing::info!(target: "camera", "[COORDINATOR] Recording ready at {:?}", output);

        Ok(output)
    }

    /// Kills any live recorder and frees the camera. Used on server shutdown.
    ///
    /// Frees unconditionally, so it must only run once every in-flight
    /// request has drained.
    pub async fn shutdown(&self) {
        let session = self.session.lock().await.take();

        if let Some(mut session) = session {
            tracing::info!(target: "camera",
                "[COORDINATOR] Shutting down live session={}", session.id);
            session.cancel();
            let _ = session.outcome().await;
        }

        self.guard.release();
    }
}

/// Best-effort removal of a leftover artifact from a previous run.
async fn remove_stale(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(target: "camera", "[COORDINATOR] Removed stale {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(target: "camera", "[COORDINATOR] Could not remove {:?}: {}", path, e),
    }
}

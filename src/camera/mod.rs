pub mod coordinator;
pub mod errors;
pub mod runner;
pub mod state;

use std::path::{Path, PathBuf};

use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use coordinator::{CameraCoordinator, CoordinatorConfig};
pub use errors::{CameraError, GuardRejection, RunnerError};
pub use runner::{CameraRunner, CommandRunner, RecordExit, ToolCommand};
pub use state::{CameraState, StateGuard};

type RecordOutcome = Result<RecordExit, RunnerError>;

/// Bookkeeping for the one in-flight recording.
///
/// Cancellation and completion are separate signals: `cancel` asks the
/// recorder to die, `outcome_rx` reports that it has. Dropping a session
/// that was never stopped cancels its recorder.
struct RecordingSession {
    id: Uuid,
    raw_path: PathBuf,
    cancel: CancellationToken,
    outcome_rx: oneshot::Receiver<RecordOutcome>,
}

impl RecordingSession {
    fn new(
        raw_path: PathBuf,
        cancel: CancellationToken,
        outcome_rx: oneshot::Receiver<RecordOutcome>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            raw_path,
            cancel,
            outcome_rx,
        }
    }

    fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking: `Some` once the recorder has terminated.
    fn try_outcome(&mut self) -> Option<RecordOutcome> {
        match self.outcome_rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(RunnerError::Detached)),
        }
    }

    /// Waits for the recorder to terminate.
    async fn outcome(&mut self) -> RecordOutcome {
        (&mut self.outcome_rx)
            .await
            .unwrap_or(Err(RunnerError::Detached))
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

use std::time::Duration;
use thiserror::Error;

use super::state::CameraState;

/// Rejections from the state guard. Never retried by the coordinator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    #[error("camera in use, taking picture")]
    BusyCapturing,
    #[error("camera in use, recording video")]
    BusyRecording,
    #[error("camera in use, processing a finished video")]
    BusyProcessing,
    #[error("camera was not recording, unable to process stop recording request")]
    NotRecording,
    #[error("unexpected camera state {0}")]
    UnexpectedState(CameraState),
}

/// Errors from launching or running one of the camera executables.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} failed with exit code {exit_code:?}: {stderr}")]
    ProcessFailed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("failed waiting on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("recorder task ended without reporting an outcome")]
    Detached,
}

impl RunnerError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        RunnerError::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn wait(program: impl Into<String>, source: std::io::Error) -> Self {
        RunnerError::Wait {
            program: program.into(),
            source,
        }
    }
}

/// Top-level error type for coordinator operations.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error(transparent)]
    Guard(#[from] GuardRejection),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("unexpected error closing camera: {0}")]
    UnexpectedStop(#[source] RunnerError),
    #[error("recorder exited within {0:?} of starting")]
    RecorderExitedEarly(Duration),
}

impl CameraError {
    /// Returns the guard rejection, if this error is one.
    pub fn rejection(&self) -> Option<&GuardRejection> {
        match self {
            CameraError::Guard(rejection) => Some(rejection),
            _ => None,
        }
    }
}

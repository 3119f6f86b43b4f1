//! Exclusive-access state machine for the camera.
//!
//! Legal transitions live in a pure table, `transition(current, desired)`,
//! so the whole set can be tested without locks. `StateGuard` wraps the
//! current state in a mutex and applies the table in one critical section.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::errors::GuardRejection;

/// What the camera hardware is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraState {
    #[default]
    Free,
    Capturing,
    Recording,
    Stopping,
}

impl CameraState {
    pub const ALL: [CameraState; 4] = [
        CameraState::Free,
        CameraState::Capturing,
        CameraState::Recording,
        CameraState::Stopping,
    ];

    /// Returns true while a recording session exists.
    pub fn has_session(&self) -> bool {
        matches!(self, CameraState::Recording | CameraState::Stopping)
    }
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CameraState::Free => "free",
            CameraState::Capturing => "capturing",
            CameraState::Recording => "recording",
            CameraState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Outcome of looking up a requested transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Allow(CameraState),
    Deny(GuardRejection),
}

/// Pure transition table: `(current, desired) -> Allow(next) | Deny(rejection)`.
///
/// Freeing always succeeds. Capturing and Stopping block everything else;
/// Recording only yields to Stopping.
pub fn transition(current: CameraState, desired: CameraState) -> Transition {
    use CameraState::*;

    match (current, desired) {
        (_, Free) => Transition::Allow(Free),

        (Free, Stopping) => Transition::Deny(GuardRejection::NotRecording),
        (Free, next) => Transition::Allow(next),

        (Capturing, _) => Transition::Deny(GuardRejection::BusyCapturing),

        (Recording, Stopping) => Transition::Allow(Stopping),
        (Recording, _) => Transition::Deny(GuardRejection::BusyRecording),

        (Stopping, _) => Transition::Deny(GuardRejection::BusyProcessing),
    }
}

/// Single lock around the process-wide camera state.
#[derive(Debug, Default)]
pub struct StateGuard {
    current: Mutex<CameraState>,
}

impl StateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> CameraState {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks `desired` against the table and applies it atomically.
    pub fn request(&self, desired: CameraState) -> Result<(), GuardRejection> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        match transition(*current, desired) {
            Transition::Allow(next) => {
                tracing::debug!(target: "camera", "[GUARD] {} -> {}", *current, next);
                *current = next;
                Ok(())
            }
            Transition::Deny(rejection) => {
                tracing::debug!(target: "camera",
                    "[GUARD] rejected {} -> {}: {}", *current, desired, rejection);
                Err(rejection)
            }
        }
    }

    /// Enters `desired` and returns a lease that frees the camera on drop.
    pub fn acquire(&self, desired: CameraState) -> Result<StateLease<'_>, GuardRejection> {
        self.request(desired)?;
        Ok(StateLease {
            guard: self,
            armed: true,
        })
    }

    /// Unconditionally returns the camera to Free.
    pub fn release(&self) {
        // Free is accepted from every state.
        let _ = self.request(CameraState::Free);
    }
}

/// RAII hold on a non-Free state. Dropping it returns the guard to Free
/// unless `keep()` was called.
#[must_use = "dropping the lease immediately frees the camera"]
pub struct StateLease<'a> {
    guard: &'a StateGuard,
    armed: bool,
}

impl StateLease<'_> {
    /// Leaves the acquired state in place; someone else frees it later.
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for StateLease<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.guard.release();
        }
    }
}

//! Session controller commands, outcomes and errors.
//!
//! This module defines the message types for communicating with the
//! `SessionActor`:
//! - `ControllerCommand`: everything the actor reacts to, from the front
//!   end (start/cancel/acknowledge), the heartbeat, and the capture worker
//! - `WorkerOutcome`: how a capture worker ended
//! - `SessionError` / `CleanupError`: failures reported by the controller

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::oneshot;

use xefrec_core::{OutputFile, SessionId, SessionParameters, SessionSnapshot, SessionState, ValidationError};

// ============================================================================
// Controller Commands
// ============================================================================

/// Commands sent to the session actor.
///
/// Front-end commands carry a oneshot channel for the response. Ticks and
/// worker completions are fire-and-forget.
#[derive(Debug)]
pub enum ControllerCommand {
    /// Start a capture session.
    ///
    /// # Errors
    /// - `SessionError::NotIdle` if a session is active or unacknowledged
    /// - `SessionError::InvalidParameters` if the exercise name is empty
    /// - `SessionError::ChannelClosed` if the controller is shutting down
    Start {
        /// What to record (boxed to keep the enum small)
        params: Box<SessionParameters>,
        /// Channel to send the output file of the new session
        respond_to: oneshot::Sender<Result<OutputFile, SessionError>>,
    },

    /// Abort the running session.
    ///
    /// # Errors
    /// - `SessionError::NotRunning` if no session is running
    Cancel {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Acknowledge a finished or failed session and return to Idle.
    ///
    /// # Errors
    /// - `SessionError::NotFinished` if there is nothing to acknowledge
    Acknowledge {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Get the current state.
    GetSnapshot {
        respond_to: oneshot::Sender<SessionSnapshot>,
    },

    /// Heartbeat from the progress clock.
    Tick {
        /// Session that armed the clock
        session: SessionId,
    },

    /// The capture worker of `session` returned.
    WorkerCompleted {
        session: SessionId,
        outcome: WorkerOutcome,
    },
}

// ============================================================================
// Worker Outcome
// ============================================================================

/// How a capture worker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The utility ran and exited on its own.
    Exited {
        /// Exit code, `None` if terminated by a signal
        code: Option<i32>,
    },

    /// The worker killed the utility because the session was cancelled.
    Killed,

    /// The utility could not be started.
    LaunchFailed { reason: String },

    /// The worker failed unexpectedly (panic or lost exit status).
    Aborted { reason: String },
}

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by controller operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Start was requested while a session is active or unacknowledged.
    #[error("cannot start a session while {state}")]
    NotIdle { state: SessionState },

    /// Cancel was requested while nothing is running.
    #[error("no capture is running (state: {state})")]
    NotRunning { state: SessionState },

    /// Acknowledge was requested while no session has ended.
    #[error("no finished session to acknowledge (state: {state})")]
    NotFinished { state: SessionState },

    /// The parameters cannot start a session.
    #[error("invalid session parameters: {0}")]
    InvalidParameters(#[from] ValidationError),

    /// The controller has shut down.
    #[error("controller channel closed")]
    ChannelClosed,
}

/// A partial output file could not be removed after a cancel.
///
/// Logged, never surfaced: leftover debris does not fail the cancel.
#[derive(Debug, Error)]
#[error("failed to remove partial output {}: {source}", path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::NotIdle {
            state: SessionState::Running,
        };
        assert_eq!(err.to_string(), "cannot start a session while running");

        let err = SessionError::NotRunning {
            state: SessionState::Idle,
        };
        assert_eq!(err.to_string(), "no capture is running (state: idle)");

        let err = SessionError::NotFinished {
            state: SessionState::Running,
        };
        assert_eq!(
            err.to_string(),
            "no finished session to acknowledge (state: running)"
        );

        let err = SessionError::ChannelClosed;
        assert_eq!(err.to_string(), "controller channel closed");
    }

    #[test]
    fn test_invalid_parameters_from_validation() {
        let err: SessionError = ValidationError::Empty {
            field: "exercise name",
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid session parameters: You have to specify exercise name"
        );
    }

    #[test]
    fn test_cleanup_error_display() {
        let err = CleanupError {
            path: PathBuf::from("out/squat-10_00_00.xef"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "locked"),
        };
        assert_eq!(
            err.to_string(),
            "failed to remove partial output out/squat-10_00_00.xef: locked"
        );
    }
}

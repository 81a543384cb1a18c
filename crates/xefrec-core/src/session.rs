//! Session identity, lifecycle state and the events published to the
//! front end.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::OutputFile;

// ============================================================================
// Session Id
// ============================================================================

/// Generation number of a capture session.
///
/// Every session started on a controller gets the next id. Ticks and
/// worker completions carry the id of the session that produced them, so
/// a late message from an earlier session can be told apart and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the id following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle state of the controller's current session.
///
/// ```text
/// Idle ──start──▶ Running ──exit────▶ Finishing ──acknowledge──▶ Idle
///                    │    ──launch error▶ Failed ──acknowledge──▶ Idle
///                    └──cancel──▶ Cancelled ──(cleanup)──────────▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Ready to start a capture
    #[default]
    Idle,
    /// The utility is recording and the heartbeat is ticking
    Running,
    /// The utility exited; waiting for the user to acknowledge
    Finishing,
    /// The user aborted the capture; cleanup in progress
    Cancelled,
    /// The utility could not be launched; waiting for acknowledgement
    Failed,
}

impl SessionState {
    /// Returns true if a new session may be started.
    #[must_use]
    pub fn accepts_start(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if the session ended and awaits acknowledgement.
    #[must_use]
    pub fn awaits_acknowledgement(self) -> bool {
        matches!(self, Self::Finishing | Self::Failed)
    }

    /// Short lowercase label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Finishing => "finishing",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Notifications published by the controller.
///
/// The front end switches on the variant to decide what to show and which
/// controller operation its single dialog button triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session started recording into `output_file`.
    Started {
        session: SessionId,
        output_file: OutputFile,
    },

    /// Heartbeat while recording. Carries no progress information; the
    /// utility does not report any.
    Tick { session: SessionId },

    /// The utility exited on its own.
    Finished { session: SessionId },

    /// The user aborted the session.
    Cancelled { session: SessionId },

    /// The utility could not be launched.
    Failed { session: SessionId, reason: String },

    /// The status surface should return to its initial message.
    Reset,
}

impl SessionEvent {
    /// Session the event belongs to, if any.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Self::Started { session, .. }
            | Self::Tick { session }
            | Self::Finished { session }
            | Self::Cancelled { session }
            | Self::Failed { session, .. } => Some(*session),
            Self::Reset => None,
        }
    }

    /// Returns true for the events that end a session.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished { .. } | Self::Cancelled { .. } | Self::Failed { .. }
        )
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Point-in-time view of a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Id of the current (or most recent) session
    pub session: SessionId,
    /// Current lifecycle state
    pub state: SessionState,
    /// Output file of the current session while it is not Idle
    pub output_file: Option<OutputFile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{validate_name, SessionParameters};
    use chrono::NaiveTime;

    #[test]
    fn test_session_id_next() {
        let id = SessionId::default();
        assert_eq!(id.as_u64(), 0);
        assert_eq!(id.next(), SessionId::new(1));
        assert_eq!(SessionId::new(7).to_string(), "#7");
    }

    #[test]
    fn test_state_predicates() {
        assert!(SessionState::Idle.accepts_start());
        for state in [
            SessionState::Running,
            SessionState::Finishing,
            SessionState::Cancelled,
            SessionState::Failed,
        ] {
            assert!(!state.accepts_start(), "{state} should reject start");
        }

        assert!(SessionState::Finishing.awaits_acknowledgement());
        assert!(SessionState::Failed.awaits_acknowledgement());
        assert!(!SessionState::Cancelled.awaits_acknowledgement());
    }

    #[test]
    fn test_event_session_and_terminal() {
        let id = SessionId::new(3);
        assert_eq!(SessionEvent::Tick { session: id }.session(), Some(id));
        assert_eq!(SessionEvent::Reset.session(), None);

        assert!(!SessionEvent::Tick { session: id }.is_terminal());
        assert!(SessionEvent::Finished { session: id }.is_terminal());
        assert!(SessionEvent::Cancelled { session: id }.is_terminal());
        assert!(SessionEvent::Failed {
            session: id,
            reason: "missing".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_event_json_shape() {
        let params = SessionParameters::new(validate_name("squat").unwrap(), 10, false, "out");
        let output = OutputFile::at(&params, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let event = SessionEvent::Started {
            session: SessionId::new(1),
            output_file: output,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "started");
        assert_eq!(json["session"], 1);
        assert!(json["output_file"]
            .as_str()
            .unwrap()
            .ends_with("squat-09_00_00.xef"));

        let json = serde_json::to_value(SessionEvent::Reset).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "reset" }));
    }
}

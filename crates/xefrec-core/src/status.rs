//! View model of the capture status dialog.
//!
//! The dialog is a message plus one button. Instead of re-wiring click
//! handlers, the front end feeds every `SessionEvent` into a
//! `StatusDisplay` and asks it which action the button currently performs.

use std::fmt;

use crate::SessionEvent;

/// Message shown when a capture starts and after every reset.
pub const INITIAL_STATUS: &str = "Capture In Progress\n";

/// Appended on every heartbeat.
const TICK_MARKER: &str = ".";

/// Appended when the utility exits on its own.
const DONE_MARKER: &str = " DONE!";

/// What the dialog's single button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogAction {
    /// Abort the running capture
    #[default]
    Cancel,
    /// Close the dialog and reset the controller
    Acknowledge,
}

impl DialogAction {
    /// Button caption.
    pub fn label(self) -> &'static str {
        match self {
            Self::Cancel => "Cancel",
            Self::Acknowledge => "Ok",
        }
    }
}

impl fmt::Display for DialogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Text, button binding and visibility of the status dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDisplay {
    message: String,
    action: DialogAction,
    visible: bool,
}

impl Default for StatusDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusDisplay {
    pub fn new() -> Self {
        Self {
            message: INITIAL_STATUS.to_string(),
            action: DialogAction::Cancel,
            visible: false,
        }
    }

    /// Folds one controller event into the dialog.
    pub fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Started { .. } => {
                self.visible = true;
            }
            SessionEvent::Tick { .. } => {
                self.message.push_str(TICK_MARKER);
            }
            SessionEvent::Finished { .. } => {
                self.message.push_str(DONE_MARKER);
                self.action = DialogAction::Acknowledge;
            }
            SessionEvent::Failed { reason, .. } => {
                self.message.push_str(" FAILED: ");
                self.message.push_str(reason);
                self.action = DialogAction::Acknowledge;
            }
            // A cancelled session is followed by Reset, which clears it.
            SessionEvent::Cancelled { .. } => {}
            SessionEvent::Reset => {
                self.message.clear();
                self.message.push_str(INITIAL_STATUS);
                self.action = DialogAction::Cancel;
                self.visible = false;
            }
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn action(&self) -> DialogAction {
        self.action
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionId;

    const ID: SessionId = SessionId::new(1);

    #[test]
    fn test_initial_state() {
        let display = StatusDisplay::new();
        assert_eq!(display.message(), "Capture In Progress\n");
        assert_eq!(display.action(), DialogAction::Cancel);
        assert!(!display.is_visible());
    }

    #[test]
    fn test_ticks_then_finish() {
        let mut display = StatusDisplay::new();
        display.apply(&SessionEvent::Tick { session: ID });
        display.apply(&SessionEvent::Tick { session: ID });
        display.apply(&SessionEvent::Tick { session: ID });
        display.apply(&SessionEvent::Finished { session: ID });

        assert_eq!(display.message(), "Capture In Progress\n... DONE!");
        assert_eq!(display.action(), DialogAction::Acknowledge);
        assert_eq!(display.action().label(), "Ok");
    }

    #[test]
    fn test_reset_restores_initial_message() {
        let mut display = StatusDisplay::new();
        display.apply(&SessionEvent::Tick { session: ID });
        display.apply(&SessionEvent::Finished { session: ID });
        display.apply(&SessionEvent::Reset);

        assert_eq!(display, StatusDisplay::new());
    }

    #[test]
    fn test_cancel_then_reset() {
        let mut display = StatusDisplay::new();
        display.apply(&SessionEvent::Tick { session: ID });
        display.apply(&SessionEvent::Cancelled { session: ID });
        assert_eq!(display.action(), DialogAction::Cancel);

        display.apply(&SessionEvent::Reset);
        assert_eq!(display.message(), INITIAL_STATUS);
    }

    #[test]
    fn test_failure_rebinds_to_acknowledge() {
        let mut display = StatusDisplay::new();
        display.apply(&SessionEvent::Failed {
            session: ID,
            reason: "executable not found".to_string(),
        });
        assert!(display.message().ends_with("FAILED: executable not found"));
        assert_eq!(display.action(), DialogAction::Acknowledge);
    }
}

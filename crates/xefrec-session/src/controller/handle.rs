//! Client interface for interacting with the SessionActor.
//!
//! The `SessionHandle` is the front end's only way into the controller.
//! It is cheap to clone; the controller runs until the last clone is gone.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `SessionError::ChannelClosed`

use tokio::sync::{broadcast, mpsc, oneshot};

use xefrec_core::{OutputFile, SessionEvent, SessionParameters, SessionSnapshot};

use super::commands::{ControllerCommand, SessionError};

// ============================================================================
// Session Handle
// ============================================================================

/// Handle for driving capture sessions.
///
/// # Usage
///
/// ```ignore
/// let mut events = handle.subscribe();
/// let output = handle.start(params).await?;
///
/// while let Ok(event) = events.recv().await {
///     status.apply(&event);
///     if event.is_terminal() {
///         break;
///     }
/// }
/// ```
#[derive(Clone)]
pub struct SessionHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<ControllerCommand>,

    /// Event broadcaster for subscribing to updates
    event_sender: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Create a new session handle.
    pub fn new(
        sender: mpsc::Sender<ControllerCommand>,
        event_sender: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            sender,
            event_sender,
        }
    }

    /// Start a capture session.
    ///
    /// Returns the output file the utility was told to write.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotIdle` if a session is running or unacknowledged
    /// - `SessionError::InvalidParameters` if the exercise name is empty
    /// - `SessionError::ChannelClosed` if the actor has shut down
    pub async fn start(&self, params: SessionParameters) -> Result<OutputFile, SessionError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(ControllerCommand::Start {
                params: Box::new(params),
                respond_to: tx,
            })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;

        rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Cancel the running session.
    ///
    /// Returns once the kill was requested and the partial output removed;
    /// the controller is Idle again at that point.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotRunning` if nothing is running
    /// - `SessionError::ChannelClosed` if the actor has shut down
    pub async fn cancel(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(ControllerCommand::Cancel { respond_to: tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;

        rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Acknowledge a finished or failed session and return to Idle.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotFinished` if no session is waiting
    /// - `SessionError::ChannelClosed` if the actor has shut down
    pub async fn acknowledge(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(ControllerCommand::Acknowledge { respond_to: tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;

        rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Get the current session state.
    ///
    /// # Errors
    ///
    /// - `SessionError::ChannelClosed` if the actor has shut down
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(ControllerCommand::GetSnapshot { respond_to: tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;

        rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Subscribe to session events.
    ///
    /// Only events published after subscribing are received. A slow
    /// subscriber may see `RecvError::Lagged` and should keep reading.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_sender.subscribe()
    }

    /// Check if the actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

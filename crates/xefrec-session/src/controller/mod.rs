//! Capture session controller using the Actor pattern.
//!
//! One actor owns the session state machine. Three independent sources
//! feed it through the same mpsc channel: the front end (via
//! `SessionHandle`), the progress clock, and the capture worker. Because
//! the actor handles one message at a time, a worker completing while the
//! user cancels resolves to exactly one terminal event.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  Start/Cancel/Ack   ┌───────────────┐  SessionEvent  ┌───────────────┐
//! │ SessionHandle │────────────────────▶│ SessionActor  │───────────────▶│  Subscribers  │
//! └───────────────┘                     └───────────────┘   (broadcast)  └───────────────┘
//!                                          ▲    ▲    │
//!                       Tick (weak sender) │    │    │ kill switch
//!                  ┌───────────────┐       │    │    ▼
//!                  │ ProgressClock │───────┘    │ ┌───────────────┐
//!                  └───────────────┘            └─│ capture worker│──▶ recording utility
//!                               WorkerCompleted   └───────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use tokio::sync::{broadcast, mpsc};

mod actor;
mod commands;
mod handle;
mod worker;

pub use actor::{ControllerConfig, SessionActor};
pub use commands::{CleanupError, ControllerCommand, SessionError, WorkerOutcome};
pub use handle::SessionHandle;

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 128;

/// Spawn the session actor and return a handle for interaction.
///
/// The actor stops once every clone of the returned handle is dropped,
/// killing a capture that is still running.
///
/// Must be called from within a tokio runtime.
///
/// # Example
///
/// ```no_run
/// use std::path::PathBuf;
/// use std::time::Duration;
/// use xefrec_session::{spawn_controller, ControllerConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_controller(ControllerConfig {
///         utility_path: PathBuf::from("KSUtil.exe"),
///         tick_interval: Duration::from_secs(1),
///     });
///
///     let snapshot = handle.snapshot().await;
/// }
/// ```
pub fn spawn_controller(config: ControllerConfig) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let actor = SessionActor::new(cmd_rx, cmd_tx.downgrade(), event_tx.clone(), config);
    tokio::spawn(actor.run());

    SessionHandle::new(cmd_tx, event_tx)
}

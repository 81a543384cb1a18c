//! xefrec Session - Runtime for timed Kinect capture sessions
//!
//! This crate runs the recording utility on behalf of a front end:
//! - `controller` - Session actor owning the capture state machine
//! - `clock` - Heartbeat ticker armed while a capture runs
//! - `process` - Ownership wrapper around the utility's OS process
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      xefrec-session                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌─────────────────┐  commands  ┌─────────────────────────┐   │
//! │  │  SessionHandle  │───────────▶│      SessionActor       │   │
//! │  │  (front end)    │◀───────────│  (session state owner)  │   │
//! │  └─────────────────┘   events   └──────┬───────────┬──────┘   │
//! │                                        │           │          │
//! │                                 arm/disarm   kill switch      │
//! │                                        ▼           ▼          │
//! │                          ┌───────────────┐ ┌───────────────┐  │
//! │                          │ ProgressClock │ │ capture worker│  │
//! │                          └───────────────┘ │ ProcessHandle │  │
//! │                                            └───────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod clock;
pub mod controller;
pub mod process;

pub use clock::ProgressClock;
pub use controller::{
    spawn_controller, CleanupError, ControllerConfig, SessionError, SessionHandle, WorkerOutcome,
};
pub use process::{KillError, LaunchError, OutputLines, ProcessHandle};

//! xefrec Core - Shared types for timed Kinect capture sessions
//!
//! This crate provides the pure domain types shared between the session
//! controller (`xefrec-session`) and the front end (`xefrec`):
//! input validation, session parameters, the recording utility's command
//! line, session state/events and the status dialog view model.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod config;
pub mod error;
pub mod params;
pub mod session;
pub mod status;
pub mod validate;

// Re-exports for convenience
pub use config::{RecorderConfig, DEFAULT_TICK_INTERVAL_MS, DEFAULT_UTILITY_PATH};
pub use error::{ConfigError, ValidationError};
pub use params::{CommandLine, OutputFile, SessionParameters, OUTPUT_EXTENSION};
pub use session::{SessionEvent, SessionId, SessionSnapshot, SessionState};
pub use status::{DialogAction, StatusDisplay, INITIAL_STATUS};
pub use validate::{validate_name, validate_seconds, ExerciseName};

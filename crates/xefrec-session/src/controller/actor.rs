//! Session actor - owns the session state machine and processes commands.
//!
//! The SessionActor is the single owner of session state. The front end,
//! the progress clock and the capture worker all talk to it through one
//! mpsc channel, so every transition happens in one task, one message at
//! a time. Completion and cancellation can both be in flight for the same
//! session; whichever is dequeued first wins and the other finds the
//! clock disarmed and does nothing.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel send failures are logged but don't panic
//! - Cleanup failures are logged and never abort a transition

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use xefrec_core::{
    CommandLine, OutputFile, RecorderConfig, SessionEvent, SessionId, SessionParameters,
    SessionSnapshot, SessionState, ValidationError,
};

use super::commands::{CleanupError, ControllerCommand, SessionError, WorkerOutcome};
use super::worker::spawn_worker;
use crate::clock::ProgressClock;

// ============================================================================
// Controller Config
// ============================================================================

/// Settings the controller needs to run sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Recording utility executable
    pub utility_path: PathBuf,
    /// Heartbeat period
    pub tick_interval: Duration,
}

impl From<&RecorderConfig> for ControllerConfig {
    fn from(config: &RecorderConfig) -> Self {
        Self {
            utility_path: config.utility_path.clone(),
            tick_interval: config.tick_interval(),
        }
    }
}

// ============================================================================
// Session Actor
// ============================================================================

/// The session actor - owns the state machine.
///
/// # Ownership
///
/// The actor owns:
/// - `state`, `session` and `output_file` of the current session
/// - `clock`: armed exactly while a session is Running
/// - `kill_switch`: the only handle on the running worker's process
///
/// Neither the clock's ticker nor the worker hold a strong sender, so the
/// actor stops as soon as every `SessionHandle` is gone.
pub struct SessionActor {
    /// Command receiver
    receiver: mpsc::Receiver<ControllerCommand>,

    /// Weak sender handed to the clock and workers for their messages
    loopback: mpsc::WeakSender<ControllerCommand>,

    /// Event publisher for the front end
    event_publisher: broadcast::Sender<SessionEvent>,

    config: ControllerConfig,

    state: SessionState,

    /// Id of the current (or most recent) session
    session: SessionId,

    /// Fixed at start, cleared when the controller returns to Idle
    output_file: Option<OutputFile>,

    clock: ProgressClock,

    /// Present while a worker may still be running the utility
    kill_switch: Option<CancellationToken>,

    /// Outputs of cancelled sessions whose workers have not reported yet,
    /// removed again once the kill is confirmed (the utility may create
    /// the file late)
    cancelled_outputs: HashMap<SessionId, OutputFile>,
}

impl SessionActor {
    /// Creates a new session actor.
    ///
    /// # Arguments
    ///
    /// * `receiver` - Channel for receiving commands
    /// * `loopback` - Weak sender of the same channel, for ticks and workers
    /// * `event_publisher` - Broadcast channel for publishing events
    /// * `config` - Utility path and heartbeat period
    pub fn new(
        receiver: mpsc::Receiver<ControllerCommand>,
        loopback: mpsc::WeakSender<ControllerCommand>,
        event_publisher: broadcast::Sender<SessionEvent>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            receiver,
            loopback,
            event_publisher,
            config,
            state: SessionState::Idle,
            session: SessionId::default(),
            output_file: None,
            clock: ProgressClock::new(),
            kill_switch: None,
            cancelled_outputs: HashMap::new(),
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until every handle has been dropped. A session
    /// still running at that point is killed.
    pub async fn run(mut self) {
        info!(utility = %self.config.utility_path.display(), "Session controller starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        self.shutdown();
        info!(session = %self.session, "Session controller stopped");
    }

    /// Dispatches a command to the appropriate handler.
    pub(crate) fn handle_command(&mut self, cmd: ControllerCommand) {
        match cmd {
            ControllerCommand::Start { params, respond_to } => {
                let result = self.handle_start(*params);
                // Ignore send error - client may have dropped the receiver
                let _ = respond_to.send(result);
            }
            ControllerCommand::Cancel { respond_to } => {
                let result = self.handle_cancel();
                let _ = respond_to.send(result);
            }
            ControllerCommand::Acknowledge { respond_to } => {
                let result = self.handle_acknowledge();
                let _ = respond_to.send(result);
            }
            ControllerCommand::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            ControllerCommand::Tick { session } => {
                self.handle_tick(session);
            }
            ControllerCommand::WorkerCompleted { session, outcome } => {
                self.handle_worker_completed(session, outcome);
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Starts a session: Idle → Running.
    fn handle_start(&mut self, params: SessionParameters) -> Result<OutputFile, SessionError> {
        if !self.state.accepts_start() {
            debug!(state = %self.state, "Rejecting start, session not idle");
            return Err(SessionError::NotIdle { state: self.state });
        }

        if params.exercise_name.is_empty() {
            return Err(ValidationError::Empty {
                field: "exercise name",
            }
            .into());
        }

        // A start arrives through a handle, so the channel is open unless
        // that handle was dropped right after sending.
        if self.loopback.upgrade().is_none() {
            return Err(SessionError::ChannelClosed);
        }

        let session = self.session.next();
        let output_file = OutputFile::now(&params);
        let command = CommandLine::record(&self.config.utility_path, &params, &output_file);
        let kill_switch = CancellationToken::new();

        self.clock.arm(
            self.config.tick_interval,
            self.loopback.clone(),
            move || ControllerCommand::Tick { session },
        );
        spawn_worker(session, command.clone(), kill_switch.clone(), self.loopback.clone());

        self.session = session;
        self.state = SessionState::Running;
        self.output_file = Some(output_file.clone());
        self.kill_switch = Some(kill_switch);

        info!(
            session = %session,
            exercise = %params.exercise_name,
            duration_secs = params.duration_seconds,
            color = params.capture_color,
            output = %output_file,
            args = %command.render(),
            "Capture session started"
        );

        self.publish(SessionEvent::Started {
            session,
            output_file: output_file.clone(),
        });

        Ok(output_file)
    }

    /// Publishes a heartbeat for the running session.
    fn handle_tick(&mut self, session: SessionId) {
        if session != self.session || self.state != SessionState::Running || !self.clock.is_armed() {
            debug!(
                tick_session = %session,
                session = %self.session,
                state = %self.state,
                "Ignoring tick for inactive session"
            );
            return;
        }

        self.publish(SessionEvent::Tick { session });
    }

    /// Finalizes a session whose worker returned.
    ///
    /// A no-op when the clock is already disarmed: the session was
    /// cancelled first, or the completion belongs to an older session.
    fn handle_worker_completed(&mut self, session: SessionId, outcome: WorkerOutcome) {
        if session != self.session || !self.clock.is_armed() {
            debug!(
                worker_session = %session,
                session = %self.session,
                outcome = ?outcome,
                "Worker completed after session ended"
            );
            self.remove_late_partial_output(session);
            return;
        }

        self.clock.disarm();
        self.kill_switch = None;

        match outcome {
            WorkerOutcome::Exited { code } => {
                self.state = SessionState::Finishing;
                info!(session = %session, exit_code = ?code, "Capture finished");
                self.publish(SessionEvent::Finished { session });
            }
            WorkerOutcome::LaunchFailed { reason } | WorkerOutcome::Aborted { reason } => {
                self.state = SessionState::Failed;
                warn!(session = %session, reason = %reason, "Capture failed");
                self.publish(SessionEvent::Failed { session, reason });
            }
            WorkerOutcome::Killed => {
                // Only the kill switch kills, and firing it disarms the
                // clock first; reaching this means the actor shut down.
                self.state = SessionState::Failed;
                let reason = "recording utility was killed".to_string();
                warn!(session = %session, "Capture worker killed while session was running");
                self.publish(SessionEvent::Failed { session, reason });
            }
        }
    }

    /// Aborts the running session: Running → Cancelled → Idle.
    fn handle_cancel(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Running {
            debug!(state = %self.state, "Rejecting cancel, nothing running");
            return Err(SessionError::NotRunning { state: self.state });
        }

        let session = self.session;

        if let Some(kill_switch) = self.kill_switch.take() {
            kill_switch.cancel();
        }
        self.clock.disarm();
        self.state = SessionState::Cancelled;
        info!(session = %session, "Capture cancelled");
        self.publish(SessionEvent::Cancelled { session });

        if let Some(output_file) = self.output_file.take() {
            log_cleanup(session, remove_partial_output(&output_file));
            self.cancelled_outputs.insert(session, output_file);
        }

        self.state = SessionState::Idle;
        self.publish(SessionEvent::Reset);

        Ok(())
    }

    /// Closes a finished or failed session: Finishing/Failed → Idle.
    fn handle_acknowledge(&mut self) -> Result<(), SessionError> {
        if !self.state.awaits_acknowledgement() {
            debug!(state = %self.state, "Rejecting acknowledge, nothing to acknowledge");
            return Err(SessionError::NotFinished { state: self.state });
        }

        info!(session = %self.session, state = %self.state, "Session acknowledged");
        self.state = SessionState::Idle;
        self.output_file = None;
        self.publish(SessionEvent::Reset);

        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Removes a cancelled session's output once more after its worker
    /// returned, unless a newer session now records to the same path.
    fn remove_late_partial_output(&mut self, session: SessionId) {
        let Some(output_file) = self.cancelled_outputs.remove(&session) else {
            return;
        };
        if self.output_file.as_ref() == Some(&output_file) {
            debug!(session = %session, "Output path reused by current session, keeping file");
            return;
        }
        log_cleanup(session, remove_partial_output(&output_file));
    }

    fn shutdown(&mut self) {
        if let Some(kill_switch) = self.kill_switch.take() {
            info!(session = %self.session, "Killing running capture on shutdown");
            kill_switch.cancel();
        }
        self.clock.disarm();
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.session,
            state: self.state,
            output_file: self.output_file.clone(),
        }
    }

    fn publish(&self, event: SessionEvent) {
        // Ignore send error - there may be no subscribers
        let _ = self.event_publisher.send(event);
    }

    /// Returns the current state (for testing).
    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns whether the progress clock is armed (for testing).
    #[cfg(test)]
    pub fn clock_armed(&self) -> bool {
        self.clock.is_armed()
    }
}

/// Deletes a partial output file.
///
/// Returns `Ok(false)` if the utility never created it.
fn remove_partial_output(output_file: &OutputFile) -> Result<bool, CleanupError> {
    match fs::remove_file(output_file.path()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CleanupError {
            path: output_file.path().to_path_buf(),
            source,
        }),
    }
}

fn log_cleanup(session: SessionId, result: Result<bool, CleanupError>) {
    match result {
        Ok(true) => info!(session = %session, "Removed partial output file"),
        Ok(false) => debug!(session = %session, "No partial output file to remove"),
        Err(e) => warn!(session = %session, error = %e, "Leaving partial output file behind"),
    }
}

//! Background capture worker.
//!
//! One worker runs per session: it launches the recording utility, echoes
//! its stdout to the log, waits for it to exit, and reports exactly one
//! `WorkerCompleted` back to the actor. The kill switch is the only way
//! the actor reaches the process.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use xefrec_core::{CommandLine, SessionId};

use super::commands::{ControllerCommand, WorkerOutcome};
use crate::process::{KillError, ProcessHandle};

/// Log target for echoed utility output, filterable on its own.
const UTILITY_OUTPUT_TARGET: &str = "xefrec_session::utility";

/// Spawns the worker for `session`.
///
/// The capture itself runs in an inner task so that a panic is caught at
/// the task boundary and still produces a completion message. The
/// process handle lives inside that task, so it is dropped (and the
/// process killed) whenever the task ends.
pub(crate) fn spawn_worker(
    session: SessionId,
    command: CommandLine,
    kill_switch: CancellationToken,
    reply: mpsc::WeakSender<ControllerCommand>,
) {
    tokio::spawn(async move {
        let capture = tokio::spawn(run_capture(session, command, kill_switch));

        let outcome = match capture.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(session = %session, error = %e, "Capture worker crashed");
                WorkerOutcome::Aborted {
                    reason: format!("capture worker crashed: {e}"),
                }
            }
        };

        let Some(reply) = reply.upgrade() else {
            debug!(session = %session, "Controller gone, dropping worker completion");
            return;
        };
        if reply
            .send(ControllerCommand::WorkerCompleted { session, outcome })
            .await
            .is_err()
        {
            debug!(session = %session, "Controller channel closed, dropping worker completion");
        }
    });
}

/// Launches the utility and supervises it until exit or kill.
async fn run_capture(
    session: SessionId,
    command: CommandLine,
    kill_switch: CancellationToken,
) -> WorkerOutcome {
    let mut process = match ProcessHandle::start(command.program(), command.args()) {
        Ok(process) => process,
        Err(e) => {
            warn!(session = %session, error = %e, "Failed to launch recording utility");
            return WorkerOutcome::LaunchFailed {
                reason: e.to_string(),
            };
        }
    };

    info!(
        session = %session,
        pid = ?process.pid(),
        "Recording utility launched"
    );

    if let Some(mut lines) = process.output_lines() {
        loop {
            tokio::select! {
                biased;

                _ = kill_switch.cancelled() => {
                    return kill(&mut process, session);
                }

                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        info!(target: UTILITY_OUTPUT_TARGET, session = %session, "{line}");
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(session = %session, error = %e, "Stopped echoing utility output");
                        // Dropping the pipe would kill the utility on its next write
                        tokio::select! {
                            biased;

                            _ = kill_switch.cancelled() => {
                                return kill(&mut process, session);
                            }

                            drained = lines.discard() => {
                                if let Err(e) = drained {
                                    debug!(session = %session, error = %e, "Utility output pipe failed");
                                }
                            }
                        }
                        break;
                    }
                },
            }
        }
    }

    tokio::select! {
        biased;

        _ = kill_switch.cancelled() => kill(&mut process, session),

        status = process.wait() => match status {
            Ok(status) => {
                if !status.success() {
                    warn!(session = %session, status = %status, "Recording utility exited unsuccessfully");
                }
                WorkerOutcome::Exited {
                    code: status.code(),
                }
            }
            Err(e) => {
                error!(session = %session, error = %e, "Lost track of recording utility");
                WorkerOutcome::Aborted {
                    reason: format!("failed to wait for recording utility: {e}"),
                }
            }
        },
    }
}

/// Requests termination; the exit itself is not awaited.
fn kill(process: &mut ProcessHandle, session: SessionId) -> WorkerOutcome {
    match process.kill() {
        Ok(()) => info!(session = %session, pid = ?process.pid(), "Recording utility killed"),
        Err(KillError::AlreadyExited) => {
            debug!(session = %session, "Recording utility already exited before kill");
        }
        Err(e) => warn!(session = %session, error = %e, "Failed to kill recording utility"),
    }
    WorkerOutcome::Killed
}

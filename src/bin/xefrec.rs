//! xefrec - Timed Kinect capture from the command line
//!
//! Validates the exercise name and duration, runs one capture through the
//! KSUtil recording utility and shows the progress dialog as text: the
//! status line gains a dot per heartbeat, Ctrl+C is the dialog's "Cancel"
//! button, and a finished capture is acknowledged automatically.
//!
//! # Usage
//!
//! ```bash
//! # Record 30 seconds of depth, IR and body data
//! xefrec squat 30
//!
//! # Include the color stream and write into a specific folder
//! xefrec squat 30 --color --output D:\captures
//!
//! # Emit session events as JSON lines instead of the status text
//! xefrec squat 30 --json
//! ```

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use xefrec_core::{DialogAction, RecorderConfig, SessionEvent, SessionParameters, StatusDisplay};
use xefrec_session::{spawn_controller, ControllerConfig, SessionError};

/// Overrides the configured recording utility.
const UTILITY_ENV: &str = "XEFREC_UTILITY";

/// Overrides the configured output folder.
const OUTPUT_DIR_ENV: &str = "XEFREC_OUTPUT_DIR";

const DEFAULT_LOG_DIRECTIVES: &str = "xefrec=info,xefrec_session=info,xefrec_core=info";

/// Exit code for rejected input, matching clap's usage errors.
const EXIT_INVALID_INPUT: u8 = 2;

/// Exit code for a capture the user cancelled (128 + SIGINT).
const EXIT_CANCELLED: u8 = 130;

/// xefrec - record a timed Kinect capture with KSUtil
#[derive(Parser, Debug)]
#[command(name = "xefrec", version, about)]
struct Args {
    /// Exercise name, used as the output file prefix ([A-Za-z0-9_.-])
    name: String,

    /// Capture duration in seconds
    seconds: String,

    /// Also record the color stream
    #[arg(short = 'c', long)]
    color: bool,

    /// Folder to write the capture into
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Path to the recording utility (KSUtil.exe)
    #[arg(long)]
    utility: Option<PathBuf>,

    /// Config file (default: <config dir>/xefrec/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print session events as JSON lines on stdout
    #[arg(long)]
    json: bool,
}

/// How the session ended, as seen by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Finished,
    Cancelled,
    Failed,
}

impl Outcome {
    fn exit_status(self) -> u8 {
        match self {
            Self::Finished => 0,
            Self::Cancelled => EXIT_CANCELLED,
            Self::Failed => 1,
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    run(args)
}

#[tokio::main]
async fn run(args: Args) -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_DIRECTIVES))?,
        )
        .with_writer(io::stderr)
        .init();

    let config = load_config(&args)?;

    let params = match SessionParameters::from_input(
        &args.name,
        &args.seconds,
        args.color,
        config.output_folder.clone(),
    ) {
        Ok(params) => params,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(EXIT_INVALID_INPUT));
        }
    };

    if !params.output_folder.is_dir() {
        bail!(
            "Output folder {} does not exist",
            params.output_folder.display()
        );
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        utility = %config.utility_path.display(),
        "xefrec starting"
    );

    let outcome = record(&config, params, args.json).await?;

    debug!(outcome = ?outcome, "xefrec exiting");
    Ok(ExitCode::from(outcome.exit_status()))
}

/// Runs one capture and renders its events until the controller is back
/// to Idle.
async fn record(config: &RecorderConfig, params: SessionParameters, json: bool) -> Result<Outcome> {
    let handle = spawn_controller(ControllerConfig::from(config));
    let mut events = handle.subscribe();
    let mut view = View::new(json);

    let output_file = handle
        .start(params)
        .await
        .context("Failed to start capture")?;
    info!(output = %output_file, "Recording");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut listening = true;
    let mut interrupts = Interrupts::default();
    let mut outcome = None;

    loop {
        tokio::select! {
            result = &mut ctrl_c, if listening => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                    listening = false;
                    continue;
                }
                ctrl_c.set(tokio::signal::ctrl_c());

                if interrupts.press() == Interrupt::Abort {
                    bail!("Interrupted again, abandoning capture");
                }
                if view.status.action() != DialogAction::Cancel {
                    continue;
                }
                info!("Ctrl+C received, cancelling capture (press again to abort)");

                let cancelled = tokio::select! {
                    result = handle.cancel() => result,
                    _ = &mut ctrl_c => {
                        bail!("Interrupted again while cancelling, abandoning capture");
                    }
                };
                match cancelled {
                    Ok(()) => {}
                    // Finished between the key press and the cancel
                    Err(SessionError::NotRunning { state }) => {
                        debug!(state = %state, "Capture already ended");
                    }
                    Err(e) => return Err(e).context("Failed to cancel capture"),
                }
            }

            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Status display fell behind");
                        continue;
                    }
                    Err(RecvError::Closed) => bail!("Session controller stopped unexpectedly"),
                };

                view.show(&event)?;

                match event {
                    SessionEvent::Finished { .. } => {
                        outcome = Some(Outcome::Finished);
                        handle.acknowledge().await.context("Failed to acknowledge capture")?;
                    }
                    SessionEvent::Failed { .. } => {
                        outcome = Some(Outcome::Failed);
                        handle.acknowledge().await.context("Failed to acknowledge capture")?;
                    }
                    SessionEvent::Cancelled { .. } => {
                        outcome = Some(Outcome::Cancelled);
                    }
                    SessionEvent::Reset => {
                        if let Some(outcome) = outcome {
                            return Ok(outcome);
                        }
                    }
                    SessionEvent::Started { .. } | SessionEvent::Tick { .. } => {}
                }
            }
        }
    }
}

// ============================================================================
// Interrupts
// ============================================================================

/// What a Ctrl+C press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Press the dialog's Cancel button
    Cancel,
    /// Give up on the session and exit; the capture dies with the process
    Abort,
}

/// Counts Ctrl+C presses over one capture.
#[derive(Debug, Default)]
struct Interrupts {
    presses: u32,
}

impl Interrupts {
    fn press(&mut self) -> Interrupt {
        self.presses = self.presses.saturating_add(1);
        if self.presses == 1 {
            Interrupt::Cancel
        } else {
            Interrupt::Abort
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Text rendering of the status dialog.
///
/// The dialog message only grows while a session runs, so each event
/// prints just the new tail.
struct View {
    status: StatusDisplay,
    printed: usize,
    json: bool,
}

impl View {
    fn new(json: bool) -> Self {
        Self {
            status: StatusDisplay::new(),
            printed: 0,
            json,
        }
    }

    fn show(&mut self, event: &SessionEvent) -> Result<()> {
        self.status.apply(event);

        let mut stdout = io::stdout().lock();

        if self.json {
            let line = serde_json::to_string(event).context("Failed to encode event")?;
            writeln!(stdout, "{line}")?;
            stdout.flush()?;
            return Ok(());
        }

        match event {
            SessionEvent::Cancelled { .. } => {
                writeln!(stdout, " CANCELLED")?;
            }
            SessionEvent::Finished { .. } | SessionEvent::Failed { .. } => {
                self.print_new_text(&mut stdout)?;
                writeln!(stdout)?;
            }
            SessionEvent::Reset => {
                self.printed = 0;
            }
            SessionEvent::Started { .. } | SessionEvent::Tick { .. } => {
                self.print_new_text(&mut stdout)?;
            }
        }
        stdout.flush()?;

        Ok(())
    }

    fn print_new_text(&mut self, out: &mut impl Write) -> io::Result<()> {
        if !self.status.is_visible() {
            return Ok(());
        }
        let message = self.status.message();
        if let Some(tail) = message.get(self.printed..) {
            out.write_all(tail.as_bytes())?;
        }
        self.printed = message.len();
        Ok(())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Loads the config file and applies environment and flag overrides.
fn load_config(args: &Args) -> Result<RecorderConfig> {
    let mut config = match args.config.clone().or_else(RecorderConfig::default_path) {
        Some(path) => RecorderConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RecorderConfig::default(),
    };

    apply_overrides(&mut config, args, |key| env::var_os(key));
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

/// Flags take precedence over environment variables, which take
/// precedence over the file. Empty variables are ignored.
fn apply_overrides<F>(config: &mut RecorderConfig, args: &Args, lookup: F)
where
    F: Fn(&str) -> Option<OsString>,
{
    let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if let Some(utility) = args.utility.clone().or_else(|| var(UTILITY_ENV).map(PathBuf::from)) {
        config.utility_path = utility;
    }
    if let Some(output) = args.output.clone().or_else(|| var(OUTPUT_DIR_ENV).map(PathBuf::from)) {
        config.output_folder = output;
    }
}

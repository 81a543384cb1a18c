//! Capture parameters, the output file they produce, and the recording
//! utility's command line.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::validate::{validate_name, validate_seconds, ExerciseName};
use crate::ValidationError;

/// Extension of the Kinect Studio event files written by the utility.
pub const OUTPUT_EXTENSION: &str = "xef";

/// Timestamp format embedded in output file names (`14_05_09`).
const TIMESTAMP_FORMAT: &str = "%H_%M_%S";

// ============================================================================
// Session Parameters
// ============================================================================

/// Everything the user chose for one capture.
///
/// Built once from validated input and never mutated afterwards; the
/// controller takes it by value when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParameters {
    /// Prefix of the output file name
    pub exercise_name: ExerciseName,
    /// Capture duration handed to the utility
    pub duration_seconds: u32,
    /// Whether the color stream is recorded in addition to depth/ir/body
    pub capture_color: bool,
    /// Folder the output file is written into
    pub output_folder: PathBuf,
}

impl SessionParameters {
    /// Assembles parameters from already validated values.
    pub fn new(
        exercise_name: ExerciseName,
        duration_seconds: u32,
        capture_color: bool,
        output_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            exercise_name,
            duration_seconds,
            capture_color,
            output_folder: output_folder.into(),
        }
    }

    /// Validates raw form text and assembles parameters.
    ///
    /// Unlike the individual validators, a session needs both the name and
    /// the seconds to be non-empty.
    ///
    /// # Errors
    ///
    /// - `ValidationError::Empty` if either field is blank
    /// - any error from `validate_name` / `validate_seconds`
    pub fn from_input(
        name_text: &str,
        seconds_text: &str,
        capture_color: bool,
        output_folder: impl Into<PathBuf>,
    ) -> Result<Self, ValidationError> {
        if name_text.trim_end_matches(&['\r', '\n'][..]).is_empty() {
            return Err(ValidationError::Empty {
                field: "exercise name",
            });
        }
        if seconds_text.trim_end_matches(&['\r', '\n'][..]).is_empty() {
            return Err(ValidationError::Empty { field: "seconds" });
        }

        let exercise_name = validate_name(name_text)?;
        let duration_seconds = validate_seconds(seconds_text)?;

        Ok(Self::new(
            exercise_name,
            duration_seconds,
            capture_color,
            output_folder,
        ))
    }
}

// ============================================================================
// Output File
// ============================================================================

/// Path of the file a session records into.
///
/// Derived once at session start as
/// `<output_folder>/<exercise_name>-<HH_MM_SS>.xef` and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputFile(PathBuf);

impl OutputFile {
    /// Derives the output file for a capture started at `time`.
    pub fn at(params: &SessionParameters, time: NaiveTime) -> Self {
        let file_name = format!(
            "{}-{}.{}",
            params.exercise_name,
            time.format(TIMESTAMP_FORMAT),
            OUTPUT_EXTENSION
        );
        Self(params.output_folder.join(file_name))
    }

    /// Derives the output file for a capture starting now (local time).
    pub fn now(params: &SessionParameters) -> Self {
        Self::at(params, Local::now().time())
    }

    /// Returns the full path.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Returns true if the utility has created the file.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.0.exists()
    }
}

impl fmt::Display for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for OutputFile {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

// ============================================================================
// Command Line
// ============================================================================

/// Invocation of the recording utility.
///
/// Grammar (order matters):
///
/// ```text
/// -record <output file> <seconds> -stream depth ir [color] body
/// ```
///
/// Arguments are kept as separate tokens and passed to the OS without a
/// shell, so paths with spaces need no quoting and the optional `color`
/// token can never run into its neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandLine {
    /// Builds the record command for `params`, writing into `output`.
    pub fn record(
        program: impl Into<PathBuf>,
        params: &SessionParameters,
        output: &OutputFile,
    ) -> Self {
        let mut args: Vec<OsString> = vec![
            "-record".into(),
            output.path().as_os_str().to_owned(),
            params.duration_seconds.to_string().into(),
            "-stream".into(),
            "depth".into(),
            "ir".into(),
        ];
        if params.capture_color {
            args.push("color".into());
        }
        args.push("body".into());

        Self {
            program: program.into(),
            args,
        }
    }

    /// Path of the executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument tokens, in order.
    pub fn args(&self) -> impl Iterator<Item = &OsStr> {
        self.args.iter().map(OsString::as_os_str)
    }

    /// Arguments joined by single spaces, for logging.
    pub fn render(&self) -> String {
        self.args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program.display(), self.render())
    }
}

//! Validation of the text typed into the capture form.
//!
//! Both validators are pure: they never touch the filesystem or any
//! session state. Trailing line breaks are stripped before checking, so
//! a value pasted with a newline is accepted the same as a typed one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Field label used in validation errors for the exercise name.
const NAME_FIELD: &str = "exercise name";

/// Name of the exercise being captured, used as the output file prefix.
///
/// Only `[A-Za-z0-9_.-]` characters are allowed, so the name is always
/// safe to embed in a file name. The empty name is valid here; the
/// non-empty requirement is enforced when a session is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseName(String);

impl ExerciseName {
    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if no name was entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ExerciseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ExerciseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn trim_line_end(text: &str) -> &str {
    text.trim_end_matches(&['\r', '\n'][..])
}

/// Validates an exercise name.
///
/// # Errors
///
/// Returns `ValidationError::InvalidCharacter` for the first character
/// outside `[A-Za-z0-9_.-]`.
///
/// # Example
///
/// ```
/// use xefrec_core::validate_name;
///
/// assert_eq!(validate_name("squat_01").unwrap().as_str(), "squat_01");
/// assert!(validate_name("squat 01").is_err());
/// ```
pub fn validate_name(text: &str) -> Result<ExerciseName, ValidationError> {
    let text = trim_line_end(text);

    if let Some((position, character)) = text.chars().enumerate().find(|(_, c)| !is_name_char(*c)) {
        return Err(ValidationError::InvalidCharacter {
            field: NAME_FIELD,
            character,
            position,
        });
    }

    Ok(ExerciseName(text.to_string()))
}

/// Validates a capture duration in seconds.
///
/// # Errors
///
/// - `ValidationError::NotNumeric` if the text is empty or contains
///   anything other than ASCII digits (signs and whitespace included)
/// - `ValidationError::OutOfRange` if the digits do not fit in a `u32`
pub fn validate_seconds(text: &str) -> Result<u32, ValidationError> {
    let text = trim_line_end(text);

    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::NotNumeric {
            value: text.to_string(),
        });
    }

    // Only digits remain, so the sole parse failure is overflow.
    text.parse::<u32>()
        .map_err(|_| ValidationError::OutOfRange {
            value: text.to_string(),
        })
}

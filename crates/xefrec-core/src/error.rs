//! Domain-specific error types following panic-free policy.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating user-entered session parameters.
///
/// These are always recovered locally: the front end re-prompts and no
/// session is started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was left blank
    #[error("You have to specify {field}")]
    Empty { field: &'static str },

    /// A character outside the allowed set was entered
    #[error("Invalid character {character:?} in {field} at position {position} (only letters, digits, '_', '.' and '-' are allowed)")]
    InvalidCharacter {
        field: &'static str,
        character: char,
        position: usize,
    },

    /// The value is not a plain digit sequence
    #[error("Not a number: {value:?} (only digits are allowed)")]
    NotNumeric { value: String },

    /// The value is numeric but does not fit the duration type
    #[error("Value out of range: {value}")]
    OutOfRange { value: String },
}

/// Errors that can occur while loading the recorder configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has wrongly typed keys
    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A key parsed but holds an unusable value
    #[error("Invalid {field} in config: {reason}")]
    Invalid { field: &'static str, reason: String },
}

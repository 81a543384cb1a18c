//! Recorder configuration loaded from `config.toml`.
//!
//! Every key is optional; a missing file yields the defaults.
//!
//! ```toml
//! utility_path = 'C:\Program Files\Microsoft SDKs\Kinect\v2.0_1409\Tools\KinectStudio\KSUtil.exe'
//! output_folder = 'D:\captures'
//! tick_interval_ms = 1000
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ConfigError;

/// Install location of the Kinect for Windows SDK 2.0 recording utility.
pub const DEFAULT_UTILITY_PATH: &str =
    "C:\\Program Files\\Microsoft SDKs\\Kinect\\v2.0_1409\\Tools\\KinectStudio\\KSUtil.exe";

/// Heartbeat period while a capture runs.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Settings shared by every capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Recording utility executable
    pub utility_path: PathBuf,
    /// Folder new captures are written into
    pub output_folder: PathBuf,
    /// Heartbeat period in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            utility_path: PathBuf::from(DEFAULT_UTILITY_PATH),
            output_folder: default_output_folder(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

/// The user's Documents folder, falling back to home, then the working
/// directory.
fn default_output_folder() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl RecorderConfig {
    /// Default location: `<config dir>/xefrec/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("xefrec").join("config.toml"))
    }

    /// Loads the config at `path`, or defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Read` if the file exists but cannot be read
    /// - `ConfigError::Parse` if it is not valid TOML for this shape
    /// - `ConfigError::Invalid` if a value is unusable
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Checks values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a zero tick interval or an empty
    /// utility path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.utility_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "utility_path",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Heartbeat period as a `Duration`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecorderConfig::default();
        assert_eq!(config.utility_path, PathBuf::from(DEFAULT_UTILITY_PATH));
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecorderConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, RecorderConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "tick_interval_ms = 250\noutput_folder = '/data/captures'\n").unwrap();

        let config = RecorderConfig::load(&path).unwrap();
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.output_folder, PathBuf::from("/data/captures"));
        assert_eq!(config.utility_path, PathBuf::from(DEFAULT_UTILITY_PATH));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "tick_interval_ms = \"soon\"\n").unwrap();

        let err = RecorderConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "tick_interval_ms = 0\n").unwrap();

        let err = RecorderConfig::load(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "tick_interval_ms",
                ..
            }
        ));
    }
}

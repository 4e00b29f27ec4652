//! Core error types for provision operations.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use std::path::PathBuf;

use thiserror::Error;

/// The standard Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for provision operations.
#[derive(Debug, Error)]
pub enum Error {
    // Argument errors
    #[error("missing argument '{key}'")]
    MissingArgument { key: String },

    #[error("invalid value for argument '{key}': {reason}")]
    InvalidArgument { key: String, reason: String },

    // Configuration errors
    #[error("failed to read config file '{path}': {reason}")]
    ConfigReadFailed { path: PathBuf, reason: String },

    #[error("TOML parse error: {reason}")]
    TomlParseFailed { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a missing argument error.
    pub fn missing_argument(key: impl Into<String>) -> Self {
        Self::MissingArgument { key: key.into() }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a config read error.
    pub fn config_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a TOML parse error.
    pub fn toml_parse_failed(reason: impl Into<String>) -> Self {
        Self::TomlParseFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

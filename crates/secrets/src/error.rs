//! Error types for the secrets crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching cluster credentials.
#[derive(Error, Debug)]
pub enum Error {
    /// The secret store address could not be used.
    #[error("invalid secret store address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Failed to reach the secret store.
    #[error("connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// No secret exists at the requested path.
    #[error("secret not found at '{path}'")]
    SecretNotFound { path: String },

    /// The secret store answered with an unexpected status.
    #[error("secret store returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The secret exists but does not have the expected shape.
    #[error("malformed secret: {reason}")]
    MalformedSecret { reason: String },

    /// The stored document is not valid base64 or UTF-8.
    #[error("invalid document encoding: {reason}")]
    InvalidEncoding { reason: String },

    /// Writing the decoded document to disk failed.
    #[error("failed to write '{path}': {reason}")]
    PersistFailed { path: PathBuf, reason: String },

    /// HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] provision_core::Error),
}

impl Error {
    /// Create an invalid address error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a connection failed error.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Create a secret not found error.
    pub fn secret_not_found(path: impl Into<String>) -> Self {
        Self::SecretNotFound { path: path.into() }
    }

    /// Create an HTTP status error.
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed secret error.
    pub fn malformed_secret(reason: impl Into<String>) -> Self {
        Self::MalformedSecret {
            reason: reason.into(),
        }
    }

    /// Create an invalid encoding error.
    pub fn invalid_encoding(reason: impl Into<String>) -> Self {
        Self::InvalidEncoding {
            reason: reason.into(),
        }
    }

    /// Create a persist failed error.
    pub fn persist_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::PersistFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

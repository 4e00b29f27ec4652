//! Error types for the reconciler crate.

use std::fmt;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Clone)]
pub enum Error {
    /// The object does not exist on the cluster.
    NotFound { kind: String, name: String },
    /// An object with the same name already exists.
    AlreadyExists { kind: String, name: String },
    /// The object changed since it was read.
    Conflict { kind: String, name: String, reason: String },
    /// The cluster rejected the object.
    Invalid { kind: String, name: String, reason: String },
    /// Any other cluster API failure.
    ApiFailed {
        operation: String,
        kind: String,
        name: String,
        reason: String,
    },
    /// A cluster client could not be built.
    ConnectionFailed { reason: String },
    /// A desired descriptor is unusable.
    InvalidDescriptor { reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { kind, name } => {
                write!(f, "{kind} '{name}' not found")
            }
            Self::AlreadyExists { kind, name } => {
                write!(f, "{kind} '{name}' already exists")
            }
            Self::Conflict { kind, name, reason } => {
                write!(f, "conflict on {kind} '{name}': {reason}")
            }
            Self::Invalid { kind, name, reason } => {
                write!(f, "{kind} '{name}' is invalid: {reason}")
            }
            Self::ApiFailed {
                operation,
                kind,
                name,
                reason,
            } => {
                write!(f, "{operation} {kind} '{name}' failed: {reason}")
            }
            Self::ConnectionFailed { reason } => {
                write!(f, "cluster connection failed: {reason}")
            }
            Self::InvalidDescriptor { reason } => {
                write!(f, "invalid descriptor: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Create a not found error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an already exists error.
    pub fn already_exists(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(
        kind: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid object error.
    pub fn invalid(
        kind: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            kind: kind.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an API failure error.
    pub fn api_failed(
        operation: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ApiFailed {
            operation: operation.into(),
            kind: kind.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a connection failed error.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid descriptor error.
    pub fn invalid_descriptor(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            reason: reason.into(),
        }
    }

    /// Map a kube client error, keeping 404/409/422 distinguishable.
    pub fn from_kube(operation: &str, kind: &str, name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => match response.code {
                404 => Self::not_found(kind, name),
                409 if response.reason == "AlreadyExists" => Self::already_exists(kind, name),
                409 => Self::conflict(kind, name, response.message),
                422 => Self::invalid(kind, name, response.message),
                code => Self::api_failed(
                    operation,
                    kind,
                    name,
                    format!("HTTP {code}: {}", response.message),
                ),
            },
            other => Self::api_failed(operation, kind, name, other.to_string()),
        }
    }

    /// Whether this error means the object is absent.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

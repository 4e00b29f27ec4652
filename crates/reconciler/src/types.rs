//! Core types for the reconciler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a reconciliation did to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconcileOutcome {
    /// The object was absent and has been created.
    Created,
    /// The object existed and has been replaced with the desired state.
    Updated,
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

/// Outcome for one named object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOutcome {
    pub kind: String,
    pub name: String,
    pub outcome: ReconcileOutcome,
}

impl ResourceOutcome {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, outcome: ReconcileOutcome) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            outcome,
        }
    }
}

impl fmt::Display for ResourceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' {}", self.kind, self.name, self.outcome)
    }
}

//! Error types for the pipeline crate.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error types.
#[derive(Debug, Error)]
pub enum Error {
    #[error("job already declared: {title}")]
    DuplicateJob { title: String },

    #[error("job not found: {title}")]
    UnknownJob { title: String },

    #[error("job depends on itself: {title}")]
    SelfDependency { title: String },

    #[error("dependency already declared: {job} -> {depends_on}")]
    DuplicateDependency { job: String, depends_on: String },

    #[error("cycle detected involving jobs: {jobs:?}")]
    CycleDetected { jobs: Vec<String> },

    #[error("{job} requires {what}, which no earlier job provided")]
    MissingPrerequisite { job: String, what: String },

    #[error(transparent)]
    Core(#[from] provision_core::Error),

    #[error(transparent)]
    Secrets(#[from] provision_secrets::Error),

    #[error(transparent)]
    Cluster(#[from] provision_reconciler::Error),
}

impl Error {
    pub fn duplicate_job(title: impl Into<String>) -> Self {
        Self::DuplicateJob {
            title: title.into(),
        }
    }

    pub fn unknown_job(title: impl Into<String>) -> Self {
        Self::UnknownJob {
            title: title.into(),
        }
    }

    pub fn self_dependency(title: impl Into<String>) -> Self {
        Self::SelfDependency {
            title: title.into(),
        }
    }

    pub fn duplicate_dependency(job: impl Into<String>, depends_on: impl Into<String>) -> Self {
        Self::DuplicateDependency {
            job: job.into(),
            depends_on: depends_on.into(),
        }
    }

    pub const fn cycle_detected(jobs: Vec<String>) -> Self {
        Self::CycleDetected { jobs }
    }

    pub fn missing_prerequisite(job: impl Into<String>, what: impl Into<String>) -> Self {
        Self::MissingPrerequisite {
            job: job.into(),
            what: what.into(),
        }
    }
}

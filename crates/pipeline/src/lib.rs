#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # provision-pipeline
//!
//! Runs the provisioning jobs in dependency order.
//!
//! This crate provides:
//! - A job dependency graph on petgraph with cycle detection
//! - An explicit [`JobContext`] carried from job to job
//! - A sequential runner that skips the dependents of a failed job
//! - The provisioning job set: fetch secrets, prepare the deployment, then
//!   create or update the namespace, configmap, deployment and service

pub mod context;
pub mod dag;
pub mod error;
pub mod job;
pub mod jobs;
pub mod runner;

// Re-export commonly used items
pub use context::{JobContext, PreparedDeployment};
pub use dag::JobGraph;
pub use error::{Error, Result};
pub use job::{Job, JobHandler};
pub use jobs::{ManagedKind, provisioning_jobs, provisioning_pipeline, titles};
pub use runner::{JobOutcome, JobStatus, Pipeline, RunReport};

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # provision-core
//!
//! Shared building blocks for the provisioning pipeline: the error type,
//! job arguments, the deployment target and run configuration.

pub mod arguments;
pub mod config;
pub mod error;
pub mod target;

pub use arguments::{Argument, ArgumentKind, Arguments, keys};
pub use config::{ClusterSettings, DeploymentSettings, ProvisionConfig, VaultSettings};
pub use error::{Error, Result};
pub use target::DeploymentTarget;

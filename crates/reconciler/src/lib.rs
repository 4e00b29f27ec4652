//! Create-or-update reconciliation of the provisioned Kubernetes objects.
//!
//! For each managed kind the reconciler reads the object by name. A missing
//! object is created; an existing one is replaced with the desired state.
//! Any other read failure is returned to the caller.
//!
//! # Key Concepts
//!
//! - [`ResourceApi`]: `get`/`create`/`update` for one kind
//! - [`ClusterClient`]: per-kind accessors, backed by `kube`
//!   ([`KubeCluster`]) or held in memory ([`InMemoryCluster`])
//! - [`ClusterConnector`]: turns a kubeconfig into a [`ClusterClient`]
//! - [`descriptors`]: the desired objects for a [`DeploymentTarget`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use provision_reconciler::{InMemoryCluster, Reconciler};
//!
//! let cluster = Arc::new(InMemoryCluster::new());
//! let reconciler = Reconciler::new(cluster);
//! let outcomes = reconciler.reconcile_all(&target).await?;
//! ```
//!
//! [`DeploymentTarget`]: provision_core::DeploymentTarget

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod api;
pub mod cluster;
pub mod descriptors;
pub mod error;
pub mod memory;
pub mod reconciler;
pub mod types;

// Re-export main types
pub use api::{ClusterClient, ClusterConnector, ResourceApi};
pub use cluster::{KubeCluster, KubeConnector, KubeResourceApi};
pub use error::{Error, Result};
pub use memory::{InMemoryCluster, InMemoryConnector, InMemoryStore};
pub use reconciler::{Reconcilable, Reconciler, reconcile};
pub use types::{ReconcileOutcome, ResourceOutcome};

//! State handed from one job to the next.

use provision_core::DeploymentTarget;
use provision_reconciler::Reconciler;
use provision_secrets::ClusterAccess;

use crate::error::{Error, Result};

/// A parsed target and a reconciler bound to its cluster.
#[derive(Debug, Clone)]
pub struct PreparedDeployment {
    pub target: DeploymentTarget,
    pub reconciler: Reconciler,
}

/// Everything earlier jobs produced for later ones.
///
/// One context is created per run and passed mutably to each job in turn.
#[derive(Debug, Default)]
pub struct JobContext {
    cluster_access: Option<ClusterAccess>,
    deployment: Option<PreparedDeployment>,
}

impl JobContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cluster_access(&mut self, access: ClusterAccess) {
        self.cluster_access = Some(access);
    }

    /// The fetched cluster access document.
    ///
    /// # Errors
    ///
    /// Returns `MissingPrerequisite` on behalf of `job` if none was stored.
    pub fn cluster_access(&self, job: &str) -> Result<&ClusterAccess> {
        self.cluster_access
            .as_ref()
            .ok_or_else(|| Error::missing_prerequisite(job, "cluster access"))
    }

    pub fn set_deployment(&mut self, deployment: PreparedDeployment) {
        self.deployment = Some(deployment);
    }

    /// The prepared deployment.
    ///
    /// # Errors
    ///
    /// Returns `MissingPrerequisite` on behalf of `job` if none was stored.
    pub fn deployment(&self, job: &str) -> Result<&PreparedDeployment> {
        self.deployment
            .as_ref()
            .ok_or_else(|| Error::missing_prerequisite(job, "a prepared deployment"))
    }

    pub const fn has_cluster_access(&self) -> bool {
        self.cluster_access.is_some()
    }

    pub const fn has_deployment(&self) -> bool {
        self.deployment.is_some()
    }
}

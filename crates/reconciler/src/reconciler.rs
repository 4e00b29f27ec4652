//! Reconciler implementation.

use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Service};
use kube::Resource;
use provision_core::DeploymentTarget;
use tracing::{debug, info, warn};

use crate::api::{ClusterClient, ResourceApi, kind_of, object_name};
use crate::descriptors;
use crate::error::Result;
use crate::types::{ReconcileOutcome, ResourceOutcome};

/// A kind the reconciler can create or update.
pub trait Reconcilable: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static {
    /// Merge what the server owns into the desired object before an update.
    ///
    /// Most kinds are submitted as is.
    #[must_use]
    fn prepare_update(self, _existing: &Self) -> Self {
        self
    }
}

impl Reconcilable for Namespace {}

impl Reconcilable for ConfigMap {}

impl Reconcilable for Deployment {}

impl Reconcilable for Service {
    /// Keep the server's metadata and the allocated cluster IP, which cannot
    /// change after creation.
    fn prepare_update(mut self, existing: &Self) -> Self {
        self.metadata = existing.metadata.clone();
        let assigned = existing.spec.as_ref();
        let spec = self.spec.get_or_insert_with(Default::default);
        spec.cluster_ip = assigned.and_then(|s| s.cluster_ip.clone());
        spec.cluster_ips = assigned.and_then(|s| s.cluster_ips.clone());
        self
    }
}

/// Create `desired` if absent, otherwise update it.
///
/// # Errors
///
/// Propagates every read error other than not-found, and any create or
/// update error.
pub async fn reconcile<K: Reconcilable>(
    api: &dyn ResourceApi<K>,
    desired: K,
) -> Result<ResourceOutcome> {
    let kind = kind_of::<K>();
    let name = object_name(&desired)?;

    let outcome = match api.get(&name).await {
        Ok(existing) => {
            debug!(kind = %kind, name = %name, "Object exists, updating");
            api.update(&desired.prepare_update(&existing)).await?;
            ReconcileOutcome::Updated
        }
        Err(e) if e.is_not_found() => {
            debug!(kind = %kind, name = %name, "Object absent, creating");
            api.create(&desired).await?;
            ReconcileOutcome::Created
        }
        Err(e) => {
            warn!(kind = %kind, name = %name, error = %e, "Read failed");
            return Err(e);
        }
    };

    info!(kind = %kind, name = %name, outcome = %outcome, "Reconciled");
    Ok(ResourceOutcome::new(kind, name, outcome))
}

/// Reconciles the objects of one deployment target against a cluster.
#[derive(Clone)]
pub struct Reconciler {
    cluster: Arc<dyn ClusterClient>,
}

impl Reconciler {
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }

    pub fn cluster(&self) -> &Arc<dyn ClusterClient> {
        &self.cluster
    }

    /// # Errors
    ///
    /// See [`reconcile`].
    pub async fn namespace(&self, target: &DeploymentTarget) -> Result<ResourceOutcome> {
        reconcile(
            self.cluster.namespaces().as_ref(),
            descriptors::namespace(target),
        )
        .await
    }

    /// # Errors
    ///
    /// See [`reconcile`].
    pub async fn config_map(&self, target: &DeploymentTarget) -> Result<ResourceOutcome> {
        reconcile(
            self.cluster.config_maps(&target.namespace).as_ref(),
            descriptors::config_map(target),
        )
        .await
    }

    /// # Errors
    ///
    /// See [`reconcile`].
    pub async fn deployment(&self, target: &DeploymentTarget) -> Result<ResourceOutcome> {
        reconcile(
            self.cluster.deployments(&target.namespace).as_ref(),
            descriptors::deployment(target),
        )
        .await
    }

    /// # Errors
    ///
    /// See [`reconcile`].
    pub async fn service(&self, target: &DeploymentTarget) -> Result<ResourceOutcome> {
        reconcile(
            self.cluster.services(&target.namespace).as_ref(),
            descriptors::service(target),
        )
        .await
    }

    /// Reconcile every object in dependency order, stopping at the first
    /// error.
    ///
    /// # Errors
    ///
    /// See [`reconcile`].
    pub async fn reconcile_all(&self, target: &DeploymentTarget) -> Result<Vec<ResourceOutcome>> {
        Ok(vec![
            self.namespace(target).await?,
            self.config_map(target).await?,
            self.deployment(target).await?,
            self.service(target).await?,
        ])
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

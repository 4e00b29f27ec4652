//! Seams between the reconciler and a cluster.
//!
//! The reconciler only needs `get`, `create` and `update` per resource kind,
//! plus a way to tell "not found" apart from other failures
//! ([`Error::is_not_found`]).

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Service};
use kube::Resource;

use crate::error::{Error, Result};

/// Read and write access to one resource kind, optionally namespace-scoped.
#[async_trait]
pub trait ResourceApi<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// Read an object by name.
    async fn get(&self, name: &str) -> Result<K>;

    /// Create an object; returns the stored version.
    async fn create(&self, object: &K) -> Result<K>;

    /// Replace an existing object; returns the stored version.
    async fn update(&self, object: &K) -> Result<K>;
}

/// Per-kind accessors for the resources the pipeline manages.
pub trait ClusterClient: Send + Sync {
    fn namespaces(&self) -> Arc<dyn ResourceApi<Namespace>>;

    fn config_maps(&self, namespace: &str) -> Arc<dyn ResourceApi<ConfigMap>>;

    fn deployments(&self, namespace: &str) -> Arc<dyn ResourceApi<Deployment>>;

    fn services(&self, namespace: &str) -> Arc<dyn ResourceApi<Service>>;
}

/// Builds a [`ClusterClient`] from a kubeconfig document.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(&self, kubeconfig: &str) -> Result<Arc<dyn ClusterClient>>;
}

/// Kind name of a resource type, e.g. `"ConfigMap"`.
pub fn kind_of<K: Resource<DynamicType = ()>>() -> String {
    K::kind(&()).into_owned()
}

/// Name of an object, which every descriptor must carry.
///
/// # Errors
///
/// Returns `InvalidDescriptor` if `metadata.name` is unset or empty.
pub fn object_name<K: Resource<DynamicType = ()>>(object: &K) -> Result<String> {
    object
        .meta()
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            Error::invalid_descriptor(format!("{} without metadata.name", kind_of::<K>()))
        })
}

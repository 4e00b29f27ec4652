//! In-process cluster.
//!
//! Behaves like an API server for the four managed kinds: server fields are
//! assigned on create, duplicate creates and updates of absent objects are
//! rejected, a stale `resourceVersion` conflicts, and a Service's `clusterIP`
//! cannot change once assigned. Used by tests and by dry runs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Service};
use kube::Resource;
use kube::config::Kubeconfig;
use tokio::sync::RwLock;
use tracing::debug;

use crate::api::{ClusterClient, ClusterConnector, ResourceApi, kind_of, object_name};
use crate::error::{Error, Result};

/// Per-kind behaviour of server-managed fields.
pub trait ServerManaged: Resource<DynamicType = ()> + Clone + Send + Sync + 'static {
    /// Fill in fields the server owns on create.
    fn assign_server_fields(&mut self, _serial: u64) {}

    /// Reject an update that changes an immutable field.
    fn check_update(_existing: &Self, _incoming: &Self) -> std::result::Result<(), String> {
        Ok(())
    }
}

impl ServerManaged for Namespace {}

impl ServerManaged for ConfigMap {}

impl ServerManaged for Deployment {}

impl ServerManaged for Service {
    fn assign_server_fields(&mut self, serial: u64) {
        let spec = self.spec.get_or_insert_with(Default::default);
        if spec.cluster_ip.as_deref().is_none_or(str::is_empty) {
            let ip = format!("10.96.{}.{}", (serial / 256) % 256, serial % 256);
            spec.cluster_ips = Some(vec![ip.clone()]);
            spec.cluster_ip = Some(ip);
        }
    }

    fn check_update(existing: &Self, incoming: &Self) -> std::result::Result<(), String> {
        let cluster_ip = |svc: &Self| svc.spec.as_ref().and_then(|s| s.cluster_ip.clone());
        let (before, after) = (cluster_ip(existing), cluster_ip(incoming));
        if before == after {
            Ok(())
        } else {
            Err(format!(
                "spec.clusterIP: field is immutable ({} -> {})",
                before.unwrap_or_default(),
                after.unwrap_or_default()
            ))
        }
    }
}

#[derive(Debug)]
struct StoreState<K> {
    objects: BTreeMap<(String, String), K>,
    serial: u64,
    read_failure: Option<String>,
}

/// Objects of one kind, keyed by `(namespace, name)`.
///
/// Cluster-scoped kinds use an empty namespace.
#[derive(Debug)]
pub struct InMemoryStore<K> {
    state: RwLock<StoreState<K>>,
}

impl<K> Default for InMemoryStore<K> {
    fn default() -> Self {
        Self {
            state: RwLock::new(StoreState {
                objects: BTreeMap::new(),
                serial: 0,
                read_failure: None,
            }),
        }
    }
}

impl<K: ServerManaged> InMemoryStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stored object, if present.
    pub async fn object(&self, namespace: &str, name: &str) -> Option<K> {
        let state = self.state.read().await;
        state
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.state.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Make every subsequent `get` fail with `reason`.
    pub async fn fail_reads(&self, reason: impl Into<String>) {
        self.state.write().await.read_failure = Some(reason.into());
    }

    /// Undo [`InMemoryStore::fail_reads`].
    pub async fn clear_failures(&self) {
        self.state.write().await.read_failure = None;
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<K> {
        let state = self.state.read().await;
        if let Some(reason) = &state.read_failure {
            return Err(Error::api_failed("get", kind_of::<K>(), name, reason.clone()));
        }
        state
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found(kind_of::<K>(), name))
    }

    async fn create(&self, namespace: &str, object: &K) -> Result<K> {
        let name = object_name(object)?;
        let key = (namespace.to_string(), name.clone());
        let mut state = self.state.write().await;
        if state.objects.contains_key(&key) {
            return Err(Error::already_exists(kind_of::<K>(), name));
        }

        state.serial += 1;
        let serial = state.serial;
        let mut stored = object.clone();
        {
            let meta = stored.meta_mut();
            meta.uid = Some(format!("00000000-0000-4000-8000-{serial:012x}"));
            meta.resource_version = Some(serial.to_string());
            if !namespace.is_empty() {
                meta.namespace = Some(namespace.to_string());
            }
        }
        stored.assign_server_fields(serial);

        debug!(kind = %kind_of::<K>(), name = %name, serial, "Stored new object");
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update(&self, namespace: &str, object: &K) -> Result<K> {
        let name = object_name(object)?;
        let key = (namespace.to_string(), name.clone());
        let mut state = self.state.write().await;
        let existing = state
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(kind_of::<K>(), &name))?;

        if let Some(incoming) = &object.meta().resource_version {
            if existing.meta().resource_version.as_ref() != Some(incoming) {
                return Err(Error::conflict(
                    kind_of::<K>(),
                    name,
                    format!("resourceVersion {incoming} is stale"),
                ));
            }
        }
        K::check_update(&existing, object)
            .map_err(|reason| Error::invalid(kind_of::<K>(), &name, reason))?;

        state.serial += 1;
        let serial = state.serial;
        let mut stored = object.clone();
        {
            let meta = stored.meta_mut();
            meta.uid.clone_from(&existing.meta().uid);
            meta.resource_version = Some(serial.to_string());
            if !namespace.is_empty() {
                meta.namespace = Some(namespace.to_string());
            }
        }

        debug!(kind = %kind_of::<K>(), name = %name, serial, "Replaced object");
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }
}

/// [`ResourceApi`] view of a store, bound to one namespace.
pub struct InMemoryResourceApi<K> {
    store: Arc<InMemoryStore<K>>,
    namespace: String,
}

impl<K> InMemoryResourceApi<K> {
    pub fn new(store: Arc<InMemoryStore<K>>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl<K: ServerManaged> ResourceApi<K> for InMemoryResourceApi<K> {
    async fn get(&self, name: &str) -> Result<K> {
        self.store.get(&self.namespace, name).await
    }

    async fn create(&self, object: &K) -> Result<K> {
        self.store.create(&self.namespace, object).await
    }

    async fn update(&self, object: &K) -> Result<K> {
        self.store.update(&self.namespace, object).await
    }
}

/// A cluster holding every managed kind in memory.
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    namespaces: Arc<InMemoryStore<Namespace>>,
    config_maps: Arc<InMemoryStore<ConfigMap>>,
    deployments: Arc<InMemoryStore<Deployment>>,
    services: Arc<InMemoryStore<Service>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace_store(&self) -> &InMemoryStore<Namespace> {
        &self.namespaces
    }

    pub fn config_map_store(&self) -> &InMemoryStore<ConfigMap> {
        &self.config_maps
    }

    pub fn deployment_store(&self) -> &InMemoryStore<Deployment> {
        &self.deployments
    }

    pub fn service_store(&self) -> &InMemoryStore<Service> {
        &self.services
    }

    /// Total number of stored objects across kinds.
    pub async fn object_count(&self) -> usize {
        self.namespaces.len().await
            + self.config_maps.len().await
            + self.deployments.len().await
            + self.services.len().await
    }
}

impl ClusterClient for InMemoryCluster {
    fn namespaces(&self) -> Arc<dyn ResourceApi<Namespace>> {
        Arc::new(InMemoryResourceApi::new(Arc::clone(&self.namespaces), ""))
    }

    fn config_maps(&self, namespace: &str) -> Arc<dyn ResourceApi<ConfigMap>> {
        Arc::new(InMemoryResourceApi::new(
            Arc::clone(&self.config_maps),
            namespace,
        ))
    }

    fn deployments(&self, namespace: &str) -> Arc<dyn ResourceApi<Deployment>> {
        Arc::new(InMemoryResourceApi::new(
            Arc::clone(&self.deployments),
            namespace,
        ))
    }

    fn services(&self, namespace: &str) -> Arc<dyn ResourceApi<Service>> {
        Arc::new(InMemoryResourceApi::new(Arc::clone(&self.services), namespace))
    }
}

/// Hands out a shared [`InMemoryCluster`] and counts connections.
///
/// The kubeconfig is still parsed, so a document that would not load
/// against a real cluster fails here too.
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    cluster: Arc<InMemoryCluster>,
    connect_count: AtomicUsize,
}

impl InMemoryConnector {
    pub fn new(cluster: Arc<InMemoryCluster>) -> Self {
        Self {
            cluster,
            connect_count: AtomicUsize::new(0),
        }
    }

    pub fn cluster(&self) -> &Arc<InMemoryCluster> {
        &self.cluster
    }

    /// How many times `connect` succeeded.
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterConnector for InMemoryConnector {
    async fn connect(&self, kubeconfig: &str) -> Result<Arc<dyn ClusterClient>> {
        Kubeconfig::from_yaml(kubeconfig)
            .map_err(|e| Error::connection_failed(format!("invalid kubeconfig: {e}")))?;
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        let cluster: Arc<dyn ClusterClient> = self.cluster.clone();
        Ok(cluster)
    }
}

//! Cluster access backed by the `kube` client.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Service};
use kube::api::{Api, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::api::{ClusterClient, ClusterConnector, ResourceApi, kind_of, object_name};
use crate::error::{Error, Result};

/// [`ResourceApi`] over a `kube::Api`.
pub struct KubeResourceApi<K> {
    api: Api<K>,
}

impl<K> KubeResourceApi<K> {
    /// Wrap a typed API handle.
    pub const fn new(api: Api<K>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<K> ResourceApi<K> for KubeResourceApi<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
{
    async fn get(&self, name: &str) -> Result<K> {
        debug!(kind = %kind_of::<K>(), name = %name, "GET");
        self.api
            .get(name)
            .await
            .map_err(|e| Error::from_kube("get", &kind_of::<K>(), name, e))
    }

    async fn create(&self, object: &K) -> Result<K> {
        let name = object_name(object)?;
        debug!(kind = %kind_of::<K>(), name = %name, "POST");
        self.api
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| Error::from_kube("create", &kind_of::<K>(), &name, e))
    }

    async fn update(&self, object: &K) -> Result<K> {
        let name = object_name(object)?;
        debug!(kind = %kind_of::<K>(), name = %name, "PUT");
        self.api
            .replace(&name, &PostParams::default(), object)
            .await
            .map_err(|e| Error::from_kube("update", &kind_of::<K>(), &name, e))
    }
}

/// A live cluster reached through `kube::Client`.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ClusterClient for KubeCluster {
    fn namespaces(&self) -> Arc<dyn ResourceApi<Namespace>> {
        Arc::new(KubeResourceApi::new(Api::all(self.client.clone())))
    }

    fn config_maps(&self, namespace: &str) -> Arc<dyn ResourceApi<ConfigMap>> {
        Arc::new(KubeResourceApi::new(Api::namespaced(
            self.client.clone(),
            namespace,
        )))
    }

    fn deployments(&self, namespace: &str) -> Arc<dyn ResourceApi<Deployment>> {
        Arc::new(KubeResourceApi::new(Api::namespaced(
            self.client.clone(),
            namespace,
        )))
    }

    fn services(&self, namespace: &str) -> Arc<dyn ResourceApi<Service>> {
        Arc::new(KubeResourceApi::new(Api::namespaced(
            self.client.clone(),
            namespace,
        )))
    }
}

/// Connects to the cluster described by a kubeconfig document.
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeConnector;

#[async_trait]
impl ClusterConnector for KubeConnector {
    async fn connect(&self, kubeconfig: &str) -> Result<Arc<dyn ClusterClient>> {
        let parsed = Kubeconfig::from_yaml(kubeconfig)
            .map_err(|e| Error::connection_failed(format!("invalid kubeconfig: {e}")))?;

        let config = Config::from_custom_kubeconfig(parsed, &KubeConfigOptions::default())
            .await
            .map_err(|e| Error::connection_failed(format!("unusable kubeconfig: {e}")))?;
        let cluster_url = config.cluster_url.to_string();

        let client = Client::try_from(config)
            .map_err(|e| Error::connection_failed(format!("client construction: {e}")))?;

        info!(cluster_url = %cluster_url, "Kubernetes client ready");
        Ok(Arc::new(KubeCluster::new(client)))
    }
}

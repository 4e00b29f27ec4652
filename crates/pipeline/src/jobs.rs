//! The provisioning job set.
//!
//! ```text
//! Get secrets -> Prepare Deployment -> Create namespace -> Create configmap
//!                                             |                   |
//!                                             +--> Create deployment <--+
//!                                                        |
//!                                                  Create Service
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use provision_core::{
    Argument, Arguments, ClusterSettings, DeploymentTarget, ProvisionConfig, VaultSettings, keys,
};
use provision_reconciler::{ClusterConnector, Reconciler};
use provision_secrets::{ClusterAccess, VaultClient};
use tracing::{debug, info};

use crate::context::{JobContext, PreparedDeployment};
use crate::error::Result;
use crate::job::{Job, JobHandler};
use crate::runner::Pipeline;

/// Job titles.
pub mod titles {
    pub const GET_SECRETS: &str = "Get secrets";
    pub const PREPARE_DEPLOYMENT: &str = "Prepare Deployment";
    pub const CREATE_NAMESPACE: &str = "Create namespace";
    pub const CREATE_CONFIG_MAP: &str = "Create configmap";
    pub const CREATE_DEPLOYMENT: &str = "Create deployment";
    pub const CREATE_SERVICE: &str = "Create Service";
}

/// Default argument values for the deployment.
pub mod defaults {
    pub const APP_NAME: &str = "vday-app";
    pub const IMAGE_NAME: &str = "nginx:latest";
    pub const REPLICAS: &str = "3";
    pub const NAMESPACE: &str = "vday-2019";
    pub const CONFIG_MAP: &str = "vday-2019";
}

/// Reads the cluster access document from the secret store.
#[derive(Debug, Clone)]
pub struct GetSecretsJob {
    vault: VaultSettings,
    cluster: ClusterSettings,
}

impl GetSecretsJob {
    pub const fn new(vault: VaultSettings, cluster: ClusterSettings) -> Self {
        Self { vault, cluster }
    }
}

#[async_trait]
impl JobHandler for GetSecretsJob {
    async fn run(&self, ctx: &mut JobContext, args: &Arguments) -> Result<()> {
        let address = args.require(keys::VAULT_ADDRESS)?;
        let token = args.require(keys::VAULT_TOKEN)?;
        let client = VaultClient::new(address, token, self.vault.timeout())?;

        let access = ClusterAccess::fetch(&client, &self.vault, &self.cluster).await?;
        ctx.set_cluster_access(access);
        Ok(())
    }
}

/// Parses the deployment arguments and connects to the cluster.
///
/// Arguments are validated before any connection attempt.
pub struct PrepareDeploymentJob {
    connector: Arc<dyn ClusterConnector>,
}

impl PrepareDeploymentJob {
    pub fn new(connector: Arc<dyn ClusterConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl JobHandler for PrepareDeploymentJob {
    async fn run(&self, ctx: &mut JobContext, args: &Arguments) -> Result<()> {
        let target = DeploymentTarget::from_arguments(args)?;
        debug!(deployment = ?target, "Deployment target parsed");

        let access = ctx.cluster_access(titles::PREPARE_DEPLOYMENT)?;
        let cluster = self.connector.connect(access.kubeconfig()).await?;

        info!(
            app = %target.app_name,
            namespace = %target.namespace,
            replicas = target.replicas,
            "Deployment prepared"
        );
        ctx.set_deployment(PreparedDeployment {
            target,
            reconciler: Reconciler::new(cluster),
        });
        Ok(())
    }
}

/// The resource a [`CreateResourceJob`] reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedKind {
    Namespace,
    ConfigMap,
    Deployment,
    Service,
}

impl ManagedKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::Namespace => titles::CREATE_NAMESPACE,
            Self::ConfigMap => titles::CREATE_CONFIG_MAP,
            Self::Deployment => titles::CREATE_DEPLOYMENT,
            Self::Service => titles::CREATE_SERVICE,
        }
    }
}

impl fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespace => write!(f, "Namespace"),
            Self::ConfigMap => write!(f, "ConfigMap"),
            Self::Deployment => write!(f, "Deployment"),
            Self::Service => write!(f, "Service"),
        }
    }
}

/// Creates or updates one kind of resource for the prepared deployment.
#[derive(Debug, Clone, Copy)]
pub struct CreateResourceJob {
    kind: ManagedKind,
}

impl CreateResourceJob {
    pub const fn new(kind: ManagedKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl JobHandler for CreateResourceJob {
    async fn run(&self, ctx: &mut JobContext, _args: &Arguments) -> Result<()> {
        let PreparedDeployment { target, reconciler } = ctx.deployment(self.kind.title())?;
        let outcome = match self.kind {
            ManagedKind::Namespace => reconciler.namespace(target).await?,
            ManagedKind::ConfigMap => reconciler.config_map(target).await?,
            ManagedKind::Deployment => reconciler.deployment(target).await?,
            ManagedKind::Service => reconciler.service(target).await?,
        };
        debug!(kind = %self.kind, resource = %outcome, "Resource reconciled");
        Ok(())
    }
}

fn resource_job(kind: ManagedKind, description: &str) -> Job {
    Job::new(kind.title(), description, CreateResourceJob::new(kind))
}

/// Declare the six provisioning jobs.
pub fn provisioning_jobs(
    config: &ProvisionConfig,
    connector: Arc<dyn ClusterConnector>,
) -> Vec<Job> {
    vec![
        Job::new(
            titles::GET_SECRETS,
            "Get secrets from vault",
            GetSecretsJob::new(config.vault.clone(), config.cluster.clone()),
        )
        .with_arg(Argument::vault(keys::VAULT_TOKEN, ""))
        .with_arg(Argument::vault(keys::VAULT_ADDRESS, "")),
        Job::new(
            titles::PREPARE_DEPLOYMENT,
            "Prepares the deployment (caches manual input and prepares kubernetes connection)",
            PrepareDeploymentJob::new(connector),
        )
        .depends_on(titles::GET_SECRETS)
        .with_arg(
            Argument::text(keys::APP_NAME, defaults::APP_NAME)
                .with_description("Application name:"),
        )
        .with_arg(
            Argument::text(keys::IMAGE_NAME, defaults::IMAGE_NAME)
                .with_description("Full image name including tag:"),
        )
        .with_arg(
            Argument::text(keys::REPLICAS, defaults::REPLICAS)
                .with_description("Number of replicas:"),
        )
        .with_arg(
            Argument::text(keys::NAMESPACE, defaults::NAMESPACE)
                .with_description("Namespace name:"),
        )
        .with_arg(
            Argument::text(keys::CONFIG_MAP, defaults::CONFIG_MAP)
                .with_description("Configmap name:"),
        ),
        resource_job(ManagedKind::Namespace, "Create kubernetes namespace")
            .depends_on(titles::PREPARE_DEPLOYMENT),
        resource_job(ManagedKind::ConfigMap, "Create kubernetes configmap")
            .depends_on(titles::CREATE_NAMESPACE),
        resource_job(ManagedKind::Deployment, "Create kubernetes app deployment")
            .depends_on(titles::CREATE_NAMESPACE)
            .depends_on(titles::CREATE_CONFIG_MAP),
        resource_job(
            ManagedKind::Service,
            "Create kubernetes service which exposes the service",
        )
        .depends_on(titles::CREATE_DEPLOYMENT),
    ]
}

/// The validated provisioning pipeline.
///
/// # Errors
///
/// Only if the declared jobs do not form a valid graph.
pub fn provisioning_pipeline(
    config: &ProvisionConfig,
    connector: Arc<dyn ClusterConnector>,
) -> Result<Pipeline> {
    Pipeline::new(provisioning_jobs(config, connector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_reconciler::InMemoryConnector;

    fn pipeline() -> Result<Pipeline> {
        provisioning_pipeline(
            &ProvisionConfig::default(),
            Arc::new(InMemoryConnector::default()),
        )
    }

    #[test]
    fn test_execution_order() -> Result<()> {
        let order = pipeline()?
            .jobs()
            .map(|job| job.title.clone())
            .collect::<Vec<_>>();

        assert_eq!(
            order,
            vec![
                "Get secrets",
                "Prepare Deployment",
                "Create namespace",
                "Create configmap",
                "Create deployment",
                "Create Service",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_deployment_waits_for_namespace_and_configmap() -> Result<()> {
        let pipeline = pipeline()?;
        assert_eq!(
            pipeline.graph().dependencies_of(titles::CREATE_DEPLOYMENT)?,
            vec![titles::CREATE_CONFIG_MAP, titles::CREATE_NAMESPACE]
        );
        assert_eq!(pipeline.graph().dependency_count(), 6);
        Ok(())
    }

    #[test]
    fn test_declared_defaults() -> Result<()> {
        let pipeline = pipeline()?;
        let prepare = pipeline
            .jobs()
            .find(|job| job.title == titles::PREPARE_DEPLOYMENT)
            .map(|job| job.args.clone())
            .unwrap_or_default();

        assert_eq!(prepare.get(keys::APP_NAME), Some("vday-app"));
        assert_eq!(prepare.get(keys::IMAGE_NAME), Some("nginx:latest"));
        assert_eq!(prepare.get(keys::REPLICAS), Some("3"));
        assert_eq!(prepare.get(keys::NAMESPACE), Some("vday-2019"));
        assert_eq!(prepare.get(keys::CONFIG_MAP), Some("vday-2019"));
        Ok(())
    }

    #[tokio::test]
    async fn test_resource_job_without_prepared_deployment_fails() {
        let mut ctx = JobContext::new();
        let result = CreateResourceJob::new(ManagedKind::Service)
            .run(&mut ctx, &Arguments::new())
            .await;

        assert!(matches!(
            result,
            Err(crate::error::Error::MissingPrerequisite { .. })
        ));
    }
}

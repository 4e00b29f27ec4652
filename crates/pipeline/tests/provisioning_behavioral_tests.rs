//! Behavioral tests for the provisioning pipeline
//!
//! Each test runs the full job set against a mock secret store and the
//! in-memory cluster.
//!
//! The pipeline is responsible for:
//! - Fetching and adjusting the cluster access document
//! - Rejecting bad deployment arguments before touching the cluster
//! - Creating every resource on an empty cluster
//! - Updating every resource on a repeated run

#![allow(clippy::panic)]

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use provision_core::{Argument, Arguments, ClusterSettings, ProvisionConfig, keys};
use provision_pipeline::{JobContext, JobStatus, RunReport, provisioning_pipeline, titles};
use provision_reconciler::{InMemoryCluster, InMemoryConnector};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

const KUBECONFIG: &str = "apiVersion: v1
kind: Config
clusters:
- cluster:
    server: https://localhost:6443
  name: localhost
contexts:
- context:
    cluster: localhost
    user: admin
  name: admin@localhost
current-context: admin@localhost
users:
- name: admin
  user:
    token: abc
";

async fn vault_serving(encoded: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/kube-conf"))
        .and(header("X-Vault-Token", "root-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "data": { "conf": encoded } }
        })))
        .mount(&server)
        .await;
    server
}

fn overrides(server: &MockServer, replicas: &str) -> Arguments {
    Arguments::new()
        .with(Argument::vault(keys::VAULT_ADDRESS, server.uri()))
        .with(Argument::vault(keys::VAULT_TOKEN, "root-token"))
        .with(Argument::text(keys::APP_NAME, "vday-test-app"))
        .with(Argument::text(keys::REPLICAS, replicas))
        .with(Argument::text(keys::CONFIG_MAP, "vday-configmap"))
}

async fn run_once(
    config: &ProvisionConfig,
    connector: &Arc<InMemoryConnector>,
    args: &Arguments,
) -> std::result::Result<RunReport, Box<dyn std::error::Error>> {
    let pipeline = provisioning_pipeline(config, connector.clone())?;
    let mut ctx = JobContext::new();
    Ok(pipeline.run(&mut ctx, args).await?)
}

async fn service_cluster_ip(cluster: &InMemoryCluster) -> Option<String> {
    cluster
        .service_store()
        .object("vday-2019", "vday-test-app")
        .await
        .and_then(|svc| svc.spec)
        .and_then(|spec| spec.cluster_ip)
}

fn status_of(report: &RunReport, title: &str) -> Option<JobStatus> {
    report.outcome(title).map(|o| o.status.clone())
}

// ============================================================================
// BEHAVIOR: Full runs
// ============================================================================

#[tokio::test]
async fn should_create_every_resource_on_an_empty_cluster() -> TestResult {
    // Given: A secret store holding a valid kubeconfig and an empty cluster
    let server = vault_serving(&STANDARD.encode(KUBECONFIG)).await;
    let cluster = Arc::new(InMemoryCluster::new());
    let connector = Arc::new(InMemoryConnector::new(cluster.clone()));

    // When: The pipeline runs
    let report = run_once(&ProvisionConfig::default(), &connector, &overrides(&server, "3")).await?;

    // Then: Every job succeeds and one object of each kind exists
    assert!(report.is_success(), "unexpected report:\n{report}");
    assert_eq!(connector.connect_count(), 1);
    assert_eq!(cluster.object_count().await, 4);

    let namespace = cluster.namespace_store().object("", "vday-2019").await;
    assert!(namespace.is_some());
    let deployment = cluster
        .deployment_store()
        .object("vday-2019", "vday-test-app")
        .await;
    assert_eq!(
        deployment.and_then(|d| d.spec).and_then(|s| s.replicas),
        Some(3)
    );
    let config_map = cluster
        .config_map_store()
        .object("vday-2019", "vday-configmap")
        .await;
    assert!(config_map.is_some());
    Ok(())
}

#[tokio::test]
async fn should_update_every_resource_on_a_second_run() -> TestResult {
    // Given: A cluster already provisioned once
    let server = vault_serving(&STANDARD.encode(KUBECONFIG)).await;
    let cluster = Arc::new(InMemoryCluster::new());
    let connector = Arc::new(InMemoryConnector::new(cluster.clone()));
    let config = ProvisionConfig::default();
    run_once(&config, &connector, &overrides(&server, "3")).await?;
    let assigned = service_cluster_ip(&cluster).await;

    // When: The pipeline runs again with a different replica count
    let report = run_once(&config, &connector, &overrides(&server, "5")).await?;

    // Then: Nothing fails, nothing is duplicated and the service keeps its IP
    assert!(report.is_success(), "unexpected report:\n{report}");
    assert_eq!(cluster.object_count().await, 4);
    assert!(assigned.is_some());
    assert_eq!(service_cluster_ip(&cluster).await, assigned);
    let replicas = cluster
        .deployment_store()
        .object("vday-2019", "vday-test-app")
        .await
        .and_then(|d| d.spec)
        .and_then(|s| s.replicas);
    assert_eq!(replicas, Some(5));
    Ok(())
}

#[tokio::test]
async fn should_persist_the_adjusted_kubeconfig_when_configured() -> TestResult {
    // Given: An output path for the kubeconfig
    let server = vault_serving(&STANDARD.encode(KUBECONFIG)).await;
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("kubeconfig");
    let config = ProvisionConfig {
        cluster: ClusterSettings {
            kubeconfig_out: Some(out.clone()),
            ..ClusterSettings::default()
        },
        ..ProvisionConfig::default()
    };
    let connector = Arc::new(InMemoryConnector::default());

    // When: The pipeline runs
    let report = run_once(&config, &connector, &overrides(&server, "3")).await?;

    // Then: The written document points at the alias, once
    assert!(report.is_success(), "unexpected report:\n{report}");
    let written = std::fs::read_to_string(&out)?;
    assert!(written.contains("server: https://host.docker.internal:6443"));
    assert!(written.contains("cluster: localhost"));
    Ok(())
}

// ============================================================================
// BEHAVIOR: Failures
// ============================================================================

#[tokio::test]
async fn should_never_connect_when_the_secret_is_not_base64() -> TestResult {
    // Given: A secret store holding garbage
    let server = vault_serving("%%% not base64 %%%").await;
    let cluster = Arc::new(InMemoryCluster::new());
    let connector = Arc::new(InMemoryConnector::new(cluster.clone()));

    // When: The pipeline runs
    let report = run_once(&ProvisionConfig::default(), &connector, &overrides(&server, "3")).await?;

    // Then: Get secrets fails, everything after it is skipped
    assert!(matches!(
        status_of(&report, titles::GET_SECRETS),
        Some(JobStatus::Failed { .. })
    ));
    assert_eq!(report.skipped().len(), 5);
    assert_eq!(connector.connect_count(), 0);
    assert_eq!(cluster.object_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn should_reject_non_numeric_replicas_before_connecting() -> TestResult {
    // Given: A valid secret but a bad replica count
    let server = vault_serving(&STANDARD.encode(KUBECONFIG)).await;
    let connector = Arc::new(InMemoryConnector::default());

    // When: The pipeline runs
    let report = run_once(
        &ProvisionConfig::default(),
        &connector,
        &overrides(&server, "three"),
    )
    .await?;

    // Then: Prepare Deployment fails and the cluster is never contacted
    assert_eq!(status_of(&report, titles::GET_SECRETS), Some(JobStatus::Succeeded));
    match status_of(&report, titles::PREPARE_DEPLOYMENT) {
        Some(JobStatus::Failed { error }) => assert!(error.contains("replicas")),
        other => panic!("expected Prepare Deployment to fail, got {other:?}"),
    }
    assert_eq!(connector.connect_count(), 0);
    assert_eq!(report.skipped().len(), 4);
    Ok(())
}

#[tokio::test]
async fn should_fail_get_secrets_without_a_token() -> TestResult {
    // Given: No token supplied
    let server = vault_serving(&STANDARD.encode(KUBECONFIG)).await;
    let args = Arguments::new().with(Argument::vault(keys::VAULT_ADDRESS, server.uri()));
    let connector = Arc::new(InMemoryConnector::default());

    // When: The pipeline runs
    let report = run_once(&ProvisionConfig::default(), &connector, &args).await?;

    // Then: The first job fails on the missing argument
    match status_of(&report, titles::GET_SECRETS) {
        Some(JobStatus::Failed { error }) => assert!(error.contains(keys::VAULT_TOKEN)),
        other => panic!("expected Get secrets to fail, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn should_skip_later_resources_when_a_read_fails() -> TestResult {
    // Given: A cluster whose config map reads fail
    let server = vault_serving(&STANDARD.encode(KUBECONFIG)).await;
    let cluster = Arc::new(InMemoryCluster::new());
    cluster.config_map_store().fail_reads("etcd unavailable").await;
    let connector = Arc::new(InMemoryConnector::new(cluster.clone()));

    // When: The pipeline runs
    let report = run_once(&ProvisionConfig::default(), &connector, &overrides(&server, "3")).await?;

    // Then: The namespace exists, the configmap job failed, the rest skipped
    assert_eq!(
        status_of(&report, titles::CREATE_NAMESPACE),
        Some(JobStatus::Succeeded)
    );
    assert!(matches!(
        status_of(&report, titles::CREATE_CONFIG_MAP),
        Some(JobStatus::Failed { .. })
    ));
    assert_eq!(
        status_of(&report, titles::CREATE_SERVICE),
        Some(JobStatus::Skipped {
            blocked_by: titles::CREATE_CONFIG_MAP.to_string()
        })
    );
    assert_eq!(cluster.object_count().await, 1);
    Ok(())
}

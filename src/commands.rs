//! Command implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use itertools::Itertools;
use provision_core::{Argument, Arguments, DeploymentTarget, ProvisionConfig};
use provision_pipeline::{
    Job, JobContext, RunReport, provisioning_jobs, provisioning_pipeline, titles,
};
use provision_reconciler::{ClusterConnector, InMemoryConnector, KubeConnector, descriptors};
use tracing::info;

/// Run-level options for `provision run`.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub vault_address: Option<String>,
    pub vault_token: Option<String>,
    pub dry_run: bool,
}

fn load_config(path: Option<&Path>) -> Result<ProvisionConfig> {
    ProvisionConfig::load(path).context("Failed to load configuration")
}

/// Config-derived overrides with command-line arguments on top.
fn overrides(config: &ProvisionConfig, args: Vec<Argument>) -> Arguments {
    args.into_iter()
        .fold(config.to_arguments(), Arguments::with)
}

pub async fn run(
    config_path: Option<&Path>,
    args: Vec<Argument>,
    options: RunOptions,
) -> Result<RunReport> {
    let mut config = load_config(config_path)?;
    if let Some(address) = options.vault_address {
        config.vault.address = Some(address);
    }
    if let Some(token) = options.vault_token {
        config.vault.token = Some(token);
    }

    let connector: Arc<dyn ClusterConnector> = if options.dry_run {
        info!("Dry run: reconciling against an in-memory cluster");
        Arc::new(InMemoryConnector::default())
    } else {
        Arc::new(KubeConnector)
    };

    let pipeline = provisioning_pipeline(&config, connector).context("Invalid job graph")?;
    let report = pipeline
        .run(&mut JobContext::new(), &overrides(&config, args))
        .await
        .context("Pipeline run failed")?;
    Ok(report)
}

fn describe_value(arg: &Argument) -> String {
    match (arg.is_sensitive(), arg.value.is_empty()) {
        (_, true) => "<unset>".to_string(),
        (true, false) => "<redacted>".to_string(),
        (false, false) => arg.value.clone(),
    }
}

pub fn plan(config_path: Option<&Path>) -> Result<String> {
    let config = load_config(config_path)?;
    let pipeline = provisioning_pipeline(&config, Arc::new(InMemoryConnector::default()))
        .context("Invalid job graph")?;
    let overrides = config.to_arguments();

    let lines = pipeline
        .jobs()
        .enumerate()
        .map(|(step, job)| {
            let depends = if job.depends_on.is_empty() {
                "-".to_string()
            } else {
                job.depends_on.iter().join(", ")
            };
            let args = job
                .resolve_args(&overrides)
                .iter()
                .map(|arg| format!("    {} = {}", arg.key, describe_value(arg)))
                .join("\n");
            format!(
                "{}. {} ({})\n    depends on: {}{}{}",
                step + 1,
                job.title,
                job.description,
                depends,
                if args.is_empty() { "" } else { "\n" },
                args
            )
        })
        .join("\n");
    Ok(lines)
}

fn prepare_job_args(jobs: &[Job], overrides: &Arguments) -> Result<Arguments> {
    jobs.iter()
        .find(|job| job.title == titles::PREPARE_DEPLOYMENT)
        .map(|job| job.resolve_args(overrides))
        .context("No deployment preparation job declared")
}

pub fn render(config_path: Option<&Path>, args: Vec<Argument>) -> Result<String> {
    let config = load_config(config_path)?;
    let jobs = provisioning_jobs(&config, Arc::new(InMemoryConnector::default()));
    let resolved = prepare_job_args(&jobs, &overrides(&config, args))?;
    let target =
        DeploymentTarget::from_arguments(&resolved).context("Invalid deployment arguments")?;

    let documents = [
        serde_yaml::to_string(&descriptors::namespace(&target))?,
        serde_yaml::to_string(&descriptors::config_map(&target))?,
        serde_yaml::to_string(&descriptors::deployment(&target))?,
        serde_yaml::to_string(&descriptors::service(&target))?,
    ];
    Ok(documents.iter().map(|doc| doc.trim_end()).join("\n---\n"))
}

//! # provision
//!
//! One-shot provisioning of an application on Kubernetes.
//!
//! ## Run Sequence
//!
//! 1. **Get secrets** - read the base64 kubeconfig from Vault and point it at
//!    the host alias
//! 2. **Prepare Deployment** - validate the deployment arguments and connect
//!    to the cluster
//! 3. **Create namespace / configmap / deployment / Service** - create each
//!    object, or update it if it already exists
//!
//! A failed step skips everything that depends on it; the process exits
//! non-zero if any step did not succeed.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::commands::RunOptions;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            args,
            vault_address,
            vault_token,
            dry_run,
        } => {
            let options = RunOptions {
                vault_address,
                vault_token,
                dry_run,
            };
            let report = commands::run(config.as_deref(), args, options).await?;
            print!("{report}");

            if report.is_success() {
                info!("Provisioning complete");
                Ok(ExitCode::SUCCESS)
            } else {
                error!(
                    failed = report.failed().len(),
                    skipped = report.skipped().len(),
                    "Provisioning incomplete"
                );
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Plan { config } => {
            println!("{}", commands::plan(config.as_deref())?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Render { config, args } => {
            println!("{}", commands::render(config.as_deref(), args)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Log to stderr so rendered output on stdout stays clean.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

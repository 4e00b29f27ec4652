//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use provision_core::{Argument, Arguments};

/// provision - one-shot Kubernetes provisioning
#[derive(Parser, Debug)]
#[command(name = "provision")]
#[command(version)]
#[command(about = "Provision an application on Kubernetes with credentials from Vault")]
#[command(
    long_about = "Fetches a kubeconfig from a Vault KV v2 secret, then creates or updates a namespace, configmap, deployment and service, running each step in dependency order."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the provisioning pipeline
    Run {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Job argument override (repeatable)
        #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE", value_parser = parse_argument)]
        args: Vec<Argument>,

        /// Vault address, e.g. http://localhost:8200
        #[arg(long)]
        vault_address: Option<String>,

        /// Vault token
        #[arg(long)]
        vault_token: Option<String>,

        /// Reconcile against an in-memory cluster instead of the real one
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Show jobs in execution order with their arguments
    Plan {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the desired resources as YAML without contacting anything
    Render {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Job argument override (repeatable)
        #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE", value_parser = parse_argument)]
        args: Vec<Argument>,
    },
}

fn parse_argument(raw: &str) -> Result<Argument, String> {
    Arguments::parse_pair(raw).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "provision",
            "run",
            "--arg",
            "replicas=5",
            "-a",
            "app-name=web",
            "--vault-address",
            "http://localhost:8200",
            "--dry-run",
        ])?;

        match cli.command {
            Commands::Run {
                args,
                vault_address,
                dry_run,
                ..
            } => {
                assert_eq!(args.len(), 2);
                assert_eq!(vault_address.as_deref(), Some("http://localhost:8200"));
                assert!(dry_run);
            }
            other => return Err(clap::Error::raw(
                clap::error::ErrorKind::InvalidSubcommand,
                format!("unexpected command {other:?}"),
            )),
        }
        Ok(())
    }

    #[test]
    fn test_malformed_arg_rejected() {
        assert!(Cli::try_parse_from(["provision", "render", "--arg", "no-equals"]).is_err());
    }
}

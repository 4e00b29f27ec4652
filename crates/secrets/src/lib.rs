#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # provision-secrets
//!
//! Fetches cluster credentials from a Vault KV v2 secret store.
//!
//! ## Example
//!
//! ```ignore
//! use provision_core::ProvisionConfig;
//! use provision_secrets::{ClusterAccess, VaultClient};
//!
//! let config = ProvisionConfig::default();
//! let client = VaultClient::new("http://localhost:8200", "root-token", config.vault.timeout())?;
//! let access = ClusterAccess::fetch(&client, &config.vault, &config.cluster).await?;
//! println!("{} bytes of kubeconfig", access.kubeconfig().len());
//! ```

pub mod access;
pub mod client;
pub mod error;

pub use access::{ClusterAccess, decode_document, substitute_host};
pub use client::VaultClient;
pub use error::{Error, Result};

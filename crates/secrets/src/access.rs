//! Cluster access document handling.
//!
//! The secret store holds a base64-encoded kubeconfig. Before it is usable
//! from inside a container, the first `localhost` is swapped for an alias
//! that resolves to the host (`host.docker.internal` by default).

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use provision_core::{ClusterSettings, VaultSettings};
use tracing::info;

use crate::client::VaultClient;
use crate::error::{Error, Result};

/// Decode a base64 document into UTF-8 text.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns `InvalidEncoding` if the payload is not standard base64 or does
/// not decode to UTF-8.
pub fn decode_document(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::invalid_encoding(format!("base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Error::invalid_encoding(format!("utf-8: {e}")))
}

/// Replace the first occurrence of `host` with `alias`.
pub fn substitute_host(document: &str, host: &str, alias: &str) -> String {
    document.replacen(host, alias, 1)
}

/// A decoded, host-adjusted kubeconfig.
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterAccess {
    kubeconfig: String,
}

impl ClusterAccess {
    /// Wrap an already prepared kubeconfig.
    pub fn new(kubeconfig: impl Into<String>) -> Self {
        Self {
            kubeconfig: kubeconfig.into(),
        }
    }

    /// Decode a stored document and apply the host substitution.
    ///
    /// # Errors
    ///
    /// See [`decode_document`].
    pub fn from_encoded(encoded: &str, cluster: &ClusterSettings) -> Result<Self> {
        let document = decode_document(encoded)?;
        Ok(Self::new(substitute_host(
            &document,
            &cluster.host,
            &cluster.host_alias,
        )))
    }

    /// Fetch the access document from the secret store.
    ///
    /// When `cluster.kubeconfig_out` is set, the result is also written to
    /// that path.
    ///
    /// # Errors
    ///
    /// Propagates secret store, decoding and file write errors.
    pub async fn fetch(
        client: &VaultClient,
        vault: &VaultSettings,
        cluster: &ClusterSettings,
    ) -> Result<Self> {
        let encoded = client
            .read_field(&vault.secret_path, &vault.secret_field)
            .await?;
        let access = Self::from_encoded(&encoded, cluster)?;

        if let Some(path) = &cluster.kubeconfig_out {
            access.persist(path).await?;
        }

        info!(
            path = %vault.secret_path,
            alias = %cluster.host_alias,
            "All data has been retrieved from the secret store"
        );
        Ok(access)
    }

    /// Write the kubeconfig to disk.
    ///
    /// # Errors
    ///
    /// Returns `PersistFailed` if the file cannot be written.
    pub async fn persist(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.kubeconfig.as_bytes())
            .await
            .map_err(|e| Error::persist_failed(path, e.to_string()))?;
        info!(path = %path.display(), "Kubeconfig written");
        Ok(())
    }

    /// The kubeconfig text.
    pub fn kubeconfig(&self) -> &str {
        &self.kubeconfig
    }
}

impl fmt::Debug for ClusterAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterAccess")
            .field("kubeconfig", &format_args!("<{} bytes>", self.kubeconfig.len()))
            .finish()
    }
}

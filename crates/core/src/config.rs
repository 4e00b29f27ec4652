//! Configuration for a provisioning run.
//!
//! Values come from an optional TOML file, then the environment, then the
//! command line. Whatever ends up here is turned into run-level argument
//! overrides with [`ProvisionConfig::to_arguments`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arguments::{Argument, Arguments, keys};
use crate::error::{Error, Result};

/// Environment variable holding the secret store address.
pub const ENV_VAULT_ADDR: &str = "VAULT_ADDR";
/// Environment variable holding the secret store token.
pub const ENV_VAULT_TOKEN: &str = "VAULT_TOKEN";
/// Environment variable overriding the loopback alias.
pub const ENV_HOST_ALIAS: &str = "PROVISION_HOST_ALIAS";
/// Environment variable overriding where the kubeconfig is written.
pub const ENV_KUBECONFIG_OUT: &str = "PROVISION_KUBECONFIG_OUT";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub vault: VaultSettings,
    pub cluster: ClusterSettings,
    pub deployment: DeploymentSettings,
}

/// Where the cluster credentials live in the secret store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    /// Secret store address, e.g. `http://localhost:8200`.
    pub address: Option<String>,
    /// Secret store token.
    pub token: Option<String>,
    /// Logical path of the KV v2 secret.
    pub secret_path: String,
    /// Field inside the secret holding the base64 kubeconfig.
    pub secret_field: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            address: None,
            token: None,
            secret_path: "secret/data/kube-conf".to_string(),
            secret_field: "conf".to_string(),
            timeout_secs: 10,
        }
    }
}

impl VaultSettings {
    /// Request timeout as a duration.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSettings")
            .field("address", &self.address)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("secret_path", &self.secret_path)
            .field("secret_field", &self.secret_field)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// How the fetched kubeconfig is adjusted before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    /// Hostname to rewrite in the kubeconfig.
    pub host: String,
    /// Replacement for the first occurrence of `host`.
    pub host_alias: String,
    /// Where to persist the rewritten kubeconfig, if anywhere.
    pub kubeconfig_out: Option<PathBuf>,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            host_alias: "host.docker.internal".to_string(),
            kubeconfig_out: None,
        }
    }
}

/// Optional overrides for the deployment arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DeploymentSettings {
    pub app_name: Option<String>,
    pub image_name: Option<String>,
    pub replicas: Option<String>,
    pub namespace: Option<String>,
    pub configmap: Option<String>,
}

impl ProvisionConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `TomlParseFailed` for malformed input and `InvalidConfig` if
    /// the parsed values are unusable.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::toml_parse_failed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigReadFailed` if the file cannot be read, otherwise the
    /// errors of [`ProvisionConfig::from_toml`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config_read_failed(path, e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Load from an optional file and overlay the process environment.
    ///
    /// # Errors
    ///
    /// See [`ProvisionConfig::from_file`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        Ok(config.overlay_env(|key| std::env::var(key).ok()))
    }

    /// Overlay values from an environment lookup.
    #[must_use]
    pub fn overlay_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(ENV_VAULT_ADDR) {
            self.vault.address = Some(address);
        }
        if let Some(token) = lookup(ENV_VAULT_TOKEN) {
            self.vault.token = Some(token);
        }
        if let Some(alias) = lookup(ENV_HOST_ALIAS) {
            self.cluster.host_alias = alias;
        }
        if let Some(path) = lookup(ENV_KUBECONFIG_OUT) {
            self.cluster.kubeconfig_out = Some(PathBuf::from(path));
        }
        self
    }

    /// Check that the values can be used.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first unusable value.
    pub fn validate(&self) -> Result<()> {
        if self.vault.secret_path.trim().is_empty() {
            return Err(Error::invalid_config("vault.secret_path must not be empty"));
        }
        if self.vault.secret_field.trim().is_empty() {
            return Err(Error::invalid_config("vault.secret_field must not be empty"));
        }
        if self.vault.timeout_secs == 0 {
            return Err(Error::invalid_config("vault.timeout_secs must be positive"));
        }
        if self.cluster.host.is_empty() {
            return Err(Error::invalid_config("cluster.host must not be empty"));
        }
        Ok(())
    }

    /// Turn the configured values into run-level argument overrides.
    pub fn to_arguments(&self) -> Arguments {
        let vault = [
            (keys::VAULT_ADDRESS, &self.vault.address),
            (keys::VAULT_TOKEN, &self.vault.token),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| Argument::vault(key, v)));

        let deployment = [
            (keys::APP_NAME, &self.deployment.app_name),
            (keys::IMAGE_NAME, &self.deployment.image_name),
            (keys::REPLICAS, &self.deployment.replicas),
            (keys::NAMESPACE, &self.deployment.namespace),
            (keys::CONFIG_MAP, &self.deployment.configmap),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| Argument::text(key, v)));

        vault.chain(deployment).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProvisionConfig::default();
        assert_eq!(config.vault.secret_path, "secret/data/kube-conf");
        assert_eq!(config.vault.secret_field, "conf");
        assert_eq!(config.vault.timeout(), Duration::from_secs(10));
        assert_eq!(config.cluster.host, "localhost");
        assert_eq!(config.cluster.host_alias, "host.docker.internal");
        assert!(config.to_arguments().is_empty());
    }

    #[test]
    fn test_from_toml() -> Result<()> {
        let config = ProvisionConfig::from_toml(
            r#"
            [vault]
            address = "http://localhost:8200"
            token = "root-token"

            [cluster]
            host_alias = "localhost"

            [deployment]
            app-name = "vday-test-app"
            replicas = "5"
            "#,
        )?;

        assert_eq!(config.vault.address.as_deref(), Some("http://localhost:8200"));
        assert_eq!(config.vault.secret_field, "conf");
        assert_eq!(config.cluster.host_alias, "localhost");

        let args = config.to_arguments();
        assert_eq!(args.get(keys::VAULT_TOKEN), Some("root-token"));
        assert_eq!(args.get(keys::APP_NAME), Some("vday-test-app"));
        assert_eq!(args.get(keys::REPLICAS), Some("5"));
        assert_eq!(args.get(keys::NAMESPACE), None);
        Ok(())
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = ProvisionConfig::from_toml("[vault]\ntimeout_secs = 0\n");
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));

        let result = ProvisionConfig::from_toml("[vault\n");
        assert!(matches!(result, Err(Error::TomlParseFailed { .. })));
    }

    #[test]
    fn test_overlay_env() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_VAULT_ADDR, "http://vault:8200"),
            (ENV_HOST_ALIAS, "10.0.0.1"),
            (ENV_KUBECONFIG_OUT, "/tmp/kubeconfig"),
        ]);

        let config =
            ProvisionConfig::default().overlay_env(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.vault.address.as_deref(), Some("http://vault:8200"));
        assert_eq!(config.vault.token, None);
        assert_eq!(config.cluster.host_alias, "10.0.0.1");
        assert_eq!(
            config.cluster.kubeconfig_out,
            Some(PathBuf::from("/tmp/kubeconfig"))
        );
    }

    #[test]
    fn test_from_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[vault]\nsecret_path = \"kv/data/cluster\"")?;

        let config = ProvisionConfig::from_file(file.path())?;
        assert_eq!(config.vault.secret_path, "kv/data/cluster");

        let missing = ProvisionConfig::from_file(Path::new("/nonexistent/provision.toml"));
        assert!(matches!(missing, Err(Error::ConfigReadFailed { .. })));
        Ok(())
    }

    #[test]
    fn test_debug_redacts_token() {
        let settings = VaultSettings {
            token: Some("root-token".to_string()),
            ..VaultSettings::default()
        };
        assert!(!format!("{settings:?}").contains("root-token"));
    }
}

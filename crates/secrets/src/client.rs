//! Vault KV v2 client.
//!
//! Only reads are supported. A secret at logical path `secret/data/kube-conf`
//! is fetched with `GET {address}/v1/secret/data/kube-conf` and the payload's
//! `data.data` map is returned.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

/// Header carrying the client token.
pub const TOKEN_HEADER: &str = "X-Vault-Token";

/// Read-only client for a Vault KV v2 engine.
#[derive(Clone)]
pub struct VaultClient {
    address: Url,
    token: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct KvResponse {
    data: Option<KvData>,
}

#[derive(Debug, Deserialize)]
struct KvData {
    data: Option<Map<String, Value>>,
}

impl VaultClient {
    /// Create a client for the given address and token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if `address` is not an absolute http(s) URL
    /// and `ConnectionFailed` if the HTTP client cannot be built.
    pub fn new(address: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(address.trim())
            .map_err(|e| Error::invalid_address(address, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_address(
                address,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::connection_failed(e.to_string()))?;

        Ok(Self {
            address: parsed,
            token: token.into(),
            http_client,
        })
    }

    /// The configured secret store address.
    pub const fn address(&self) -> &Url {
        &self.address
    }

    /// Build the HTTP URL for a logical secret path.
    fn secret_url(&self, path: &str) -> Result<Url> {
        let base = self.address.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let raw = format!("{base}/v1/{path}");
        Url::parse(&raw).map_err(|e| Error::invalid_address(raw, e.to_string()))
    }

    /// Read the key/value payload of a KV v2 secret.
    ///
    /// # Errors
    ///
    /// Returns `SecretNotFound` on 404, `HttpStatus` for any other
    /// unsuccessful status, `MalformedSecret` when the body is not a KV v2
    /// payload, and `ConnectionFailed` when the store is unreachable.
    pub async fn read_secret(&self, path: &str) -> Result<Map<String, Value>> {
        let url = self.secret_url(path)?;
        debug!(url = %url, "Reading secret");

        let response = self
            .http_client
            .get(url)
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    Error::connection_failed(e.to_string())
                } else {
                    Error::Http(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::secret_not_found(path));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        let body = response.text().await?;
        let parsed: KvResponse = serde_json::from_str(&body)
            .map_err(|e| Error::malformed_secret(format!("invalid JSON body: {e}")))?;

        let data = parsed
            .data
            .and_then(|outer| outer.data)
            .ok_or_else(|| Error::malformed_secret(format!("no data at '{path}'")))?;

        info!(path = %path, keys = data.len(), "Secret retrieved");
        Ok(data)
    }

    /// Read a single string field of a KV v2 secret.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`VaultClient::read_secret`], or
    /// `MalformedSecret` if the field is missing or not a string.
    pub async fn read_field(&self, path: &str, field: &str) -> Result<String> {
        let data = self.read_secret(path).await?;
        match data.get(field) {
            Some(Value::String(value)) => Ok(value.clone()),
            Some(_) => Err(Error::malformed_secret(format!(
                "field '{field}' at '{path}' is not a string"
            ))),
            None => Err(Error::malformed_secret(format!(
                "field '{field}' missing at '{path}'"
            ))),
        }
    }
}

impl fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultClient")
            .field("address", &self.address.as_str())
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn mount_secret(server: &MockServer, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/v1/secret/data/kube-conf"))
            .and(header(TOKEN_HEADER, "root-token"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_rejects_invalid_address() {
        assert!(matches!(
            VaultClient::new("not a url", "t", TIMEOUT),
            Err(Error::InvalidAddress { .. })
        ));
        assert!(matches!(
            VaultClient::new("ftp://vault:21", "t", TIMEOUT),
            Err(Error::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_secret_url_joins_path() -> Result<()> {
        let client = VaultClient::new("http://localhost:8200/", "t", TIMEOUT)?;
        let url = client.secret_url("/secret/data/kube-conf")?;
        assert_eq!(url.as_str(), "http://localhost:8200/v1/secret/data/kube-conf");
        Ok(())
    }

    #[test]
    fn test_debug_redacts_token() -> Result<()> {
        let client = VaultClient::new("http://localhost:8200", "root-token", TIMEOUT)?;
        assert!(!format!("{client:?}").contains("root-token"));
        Ok(())
    }

    #[tokio::test]
    async fn test_read_field_success() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        mount_secret(
            &server,
            200,
            serde_json::json!({
                "data": {
                    "data": { "conf": "YXBpVmVyc2lvbjogdjE=" },
                    "metadata": { "version": 1 }
                }
            }),
        )
        .await;

        let client = VaultClient::new(&server.uri(), "root-token", TIMEOUT)?;
        let value = client.read_field("secret/data/kube-conf", "conf").await?;

        assert_eq!(value, "YXBpVmVyc2lvbjogdjE=");
        Ok(())
    }

    #[tokio::test]
    async fn test_read_secret_not_found() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        mount_secret(&server, 404, serde_json::json!({ "errors": [] })).await;

        let client = VaultClient::new(&server.uri(), "root-token", TIMEOUT)?;
        let result = client.read_secret("secret/data/kube-conf").await;

        assert!(matches!(result, Err(Error::SecretNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_read_secret_server_error() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let server = MockServer::start().await;
        mount_secret(
            &server,
            503,
            serde_json::json!({ "errors": ["Vault is sealed"] }),
        )
        .await;

        let client = VaultClient::new(&server.uri(), "root-token", TIMEOUT)?;
        let result = client.read_secret("secret/data/kube-conf").await;

        match result {
            Err(Error::HttpStatus { status, body }) => {
                assert_eq!(status, 503);
                assert!(body.contains("sealed"));
            }
            other => return Err(format!("expected HttpStatus, got {other:?}").into()),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_token_is_not_matched() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let server = MockServer::start().await;
        mount_secret(&server, 200, serde_json::json!({ "data": { "data": {} } })).await;

        let client = VaultClient::new(&server.uri(), "other-token", TIMEOUT)?;
        let result = client.read_secret("secret/data/kube-conf").await;

        // wiremock answers unmatched requests with 404
        assert!(matches!(result, Err(Error::SecretNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_field_is_malformed() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let server = MockServer::start().await;
        mount_secret(
            &server,
            200,
            serde_json::json!({ "data": { "data": { "other": "x", "conf": 42 } } }),
        )
        .await;

        let client = VaultClient::new(&server.uri(), "root-token", TIMEOUT)?;

        let missing = client.read_field("secret/data/kube-conf", "absent").await;
        assert!(matches!(missing, Err(Error::MalformedSecret { .. })));

        let not_string = client.read_field("secret/data/kube-conf", "conf").await;
        assert!(matches!(not_string, Err(Error::MalformedSecret { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_body_without_data_is_malformed()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        mount_secret(&server, 200, serde_json::json!({ "warnings": null })).await;

        let client = VaultClient::new(&server.uri(), "root-token", TIMEOUT)?;
        let result = client.read_secret("secret/data/kube-conf").await;

        assert!(matches!(result, Err(Error::MalformedSecret { .. })));
        Ok(())
    }
}

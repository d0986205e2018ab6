//! HashiCorp Vault secret store implementation.
//!
//! KV v2 reads go through `vaultrs`. Dynamic database credentials and the
//! lease lifecycle (`sys/leases/renew`, `sys/leases/revoke`) are plain Vault
//! HTTP API calls, since the lease metadata lives in the response envelope.
//!
//! # Configuration
//!
//! - `VAULT_ADDR`: Vault server address (required to enable Vault)
//! - `VAULT_TOKEN`: authentication token
//! - `VAULT_NAMESPACE`: optional Enterprise namespace
//! - `VAULT_KV_MOUNT`: KV v2 mount path (default: "secret")
//! - `VAULT_DATABASE_MOUNT`: database secrets engine mount path (default: "database")
//!
//! # Example
//!
//! ```rust,ignore
//! use credkeeper::secrets::{SecretStore, VaultConfig, VaultSecretStore};
//!
//! let store = VaultSecretStore::connect(VaultConfig {
//!     address: "https://vault.example.com:8200".to_string(),
//!     token: Some("s.token".to_string()),
//!     ..Default::default()
//! })
//! .await?;
//!
//! let creds = store.generate_dynamic_credentials("orders-readonly").await?;
//! ```

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use super::client::{LeaseRenewal, LeasedSecret, SecretStore};
use super::error::{Result, SecretsError};
use super::types::SecretString;

/// Configuration for the HashiCorp Vault secret store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200")
    pub address: String,

    /// Vault authentication token
    pub token: Option<String>,

    /// Vault namespace (for Enterprise multi-tenancy)
    pub namespace: Option<String>,

    /// KV v2 mount path (default: "secret")
    #[serde(default = "default_kv_mount")]
    pub kv_mount_path: String,

    /// Database secrets engine mount path (default: "database")
    #[serde(default = "default_database_mount")]
    pub database_mount_path: String,

    /// Per-request timeout for the lease API calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_kv_mount() -> String {
    "secret".to_string()
}

fn default_database_mount() -> String {
    "database".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            token: None,
            namespace: None,
            kv_mount_path: default_kv_mount(),
            database_mount_path: default_database_mount(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl VaultConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` when `VAULT_ADDR` is not set, meaning no secret store
    /// is configured and only static credentials can be used.
    pub fn from_env() -> Option<Self> {
        let address = std::env::var("VAULT_ADDR").ok()?;

        let token = std::env::var("VAULT_TOKEN").ok();
        let namespace = std::env::var("VAULT_NAMESPACE").ok();
        let kv_mount_path = std::env::var("VAULT_KV_MOUNT").unwrap_or_else(|_| default_kv_mount());
        let database_mount_path =
            std::env::var("VAULT_DATABASE_MOUNT").unwrap_or_else(|_| default_database_mount());

        Some(Self {
            address,
            token,
            namespace,
            kv_mount_path,
            database_mount_path,
            request_timeout_seconds: default_request_timeout(),
        })
    }
}

/// Envelope every Vault logical response is wrapped in.
#[derive(Debug, Deserialize)]
struct VaultEnvelope<T> {
    #[serde(default)]
    lease_id: String,
    #[serde(default)]
    renewable: bool,
    #[serde(default)]
    lease_duration: u64,
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct VaultErrors {
    #[serde(default)]
    errors: Vec<String>,
}

/// HashiCorp Vault implementation of [`SecretStore`].
///
/// # Thread Safety
///
/// This client is `Send + Sync` and can be shared across managers behind an `Arc`.
pub struct VaultSecretStore {
    client: VaultClient,
    http: reqwest::Client,
    address: String,
    token: Option<SecretString>,
    namespace: Option<String>,
    kv_mount_path: String,
    database_mount_path: String,
}

impl std::fmt::Debug for VaultSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretStore")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("kv_mount_path", &self.kv_mount_path)
            .field("database_mount_path", &self.database_mount_path)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultSecretStore {
    /// Creates a store without contacting Vault.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::ConfigError`] if the address is empty or the client cannot be built
    pub fn new(config: VaultConfig) -> Result<Self> {
        if config.address.is_empty() {
            return Err(SecretsError::config_error("Vault address cannot be empty"));
        }

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        if let Some(ref token) = config.token {
            settings_builder.token(token);
        }

        if let Some(ref namespace) = config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            SecretsError::config_error(format!("Invalid Vault configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            SecretsError::config_error(format!("Failed to create Vault client: {}", e))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| SecretsError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http,
            address: config.address.trim_end_matches('/').to_string(),
            token: config.token.map(SecretString::new),
            namespace: config.namespace,
            kv_mount_path: config.kv_mount_path,
            database_mount_path: config.database_mount_path,
        })
    }

    /// Creates a store and verifies Vault is reachable via `sys/health`.
    pub async fn connect(config: VaultConfig) -> Result<Self> {
        let store = Self::new(config)?;
        store.health_check().await?;
        Ok(store)
    }

    /// Creates a store from environment configuration, `None` if `VAULT_ADDR` is unset.
    pub async fn from_env() -> Result<Option<Self>> {
        match VaultConfig::from_env() {
            Some(config) => Ok(Some(Self::connect(config).await?)),
            None => Ok(None),
        }
    }

    /// Check that Vault answers its health endpoint.
    pub async fn health_check(&self) -> Result<()> {
        match vaultrs::sys::health(&self.client).await {
            Ok(_) => {
                tracing::info!(address = %self.address, "Successfully connected to Vault");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, address = %self.address, "Failed to connect to Vault");
                Err(SecretsError::connection_failed(format!("Vault health check failed: {}", e)))
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(ref token) = self.token {
            builder = builder.header("X-Vault-Token", token.expose_secret());
        }
        if let Some(ref namespace) = self.namespace {
            builder = builder.header("X-Vault-Namespace", namespace);
        }
        builder
    }

    /// Send a request and decode the Vault envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<VaultEnvelope<T>> {
        let response = builder.send().await.map_err(|e| {
            SecretsError::connection_failed(format!("{} request failed: {}", what, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, what, &body));
        }

        let body = response.bytes().await.map_err(|e| {
            SecretsError::connection_failed(format!("{} response could not be read: {}", what, e))
        })?;
        Ok(serde_json::from_slice::<VaultEnvelope<T>>(&body)?)
    }

    /// Send a request whose response carries no body (204).
    async fn send_empty(&self, builder: reqwest::RequestBuilder, what: &str) -> Result<()> {
        let response = builder.send().await.map_err(|e| {
            SecretsError::connection_failed(format!("{} request failed: {}", what, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, what, &body));
        }
        Ok(())
    }
}

/// Map a non-2xx Vault status into the secrets error taxonomy.
fn status_error(status: StatusCode, what: &str, body: &str) -> SecretsError {
    let detail = serde_json::from_str::<VaultErrors>(body)
        .map(|e| e.errors.join("; "))
        .unwrap_or_default();

    match status {
        StatusCode::NOT_FOUND => SecretsError::not_found(what),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SecretsError::authentication_failed(format!("{}: HTTP {} {}", what, status, detail))
        }
        _ => SecretsError::backend_error(format!("{}: HTTP {} {}", what, status, detail)),
    }
}

fn kv_error(path: &str, err: ClientError) -> SecretsError {
    match err {
        ClientError::APIError { code: 404, .. } => SecretsError::not_found(path),
        ClientError::APIError { code: 401, .. } | ClientError::APIError { code: 403, .. } => {
            SecretsError::authentication_failed(format!("read secret '{}' was denied", path))
        }
        ClientError::APIError { code, errors } => SecretsError::backend_error(format!(
            "read secret '{}': HTTP {} {}",
            path,
            code,
            errors.join("; ")
        )),
        other => SecretsError::connection_failed(format!("read secret '{}': {}", path, other)),
    }
}

#[async_trait]
impl SecretStore for VaultSecretStore {
    async fn read_kv(&self, path: &str) -> Result<HashMap<String, Value>> {
        let data: HashMap<String, Value> =
            kv2::read(&self.client, &self.kv_mount_path, path).await.map_err(|e| {
                tracing::error!(error = %e, path = %path, "Failed to read secret from Vault");
                kv_error(path, e)
            })?;

        tracing::debug!(path = %path, mount_path = %self.kv_mount_path, "Read KV secret from Vault");
        Ok(data)
    }

    async fn generate_dynamic_credentials(&self, role: &str) -> Result<LeasedSecret> {
        let path = format!("{}/creds/{}", self.database_mount_path, role);
        let what = format!("generate credentials for role '{}'", role);

        let envelope: VaultEnvelope<HashMap<String, Value>> =
            self.send(self.request(Method::GET, &path), &what).await?;

        if envelope.lease_id.is_empty() {
            return Err(SecretsError::backend_error(format!("{} returned no lease_id", what)));
        }

        Ok(LeasedSecret {
            data: envelope.data.unwrap_or_default(),
            lease_id: envelope.lease_id,
            lease_duration_seconds: envelope.lease_duration,
            renewable: envelope.renewable,
        })
    }

    async fn renew_lease(&self, lease_id: &str, increment: Duration) -> Result<LeaseRenewal> {
        let what = format!("renew lease '{}'", lease_id);
        let body = json!({ "lease_id": lease_id, "increment": increment.as_secs() });

        let envelope: VaultEnvelope<Value> =
            self.send(self.request(Method::PUT, "sys/leases/renew").json(&body), &what).await?;

        let lease_id =
            if envelope.lease_id.is_empty() { lease_id.to_string() } else { envelope.lease_id };

        Ok(LeaseRenewal { lease_id, lease_duration_seconds: envelope.lease_duration })
    }

    async fn revoke_lease(&self, lease_id: &str) -> Result<()> {
        let what = format!("revoke lease '{}'", lease_id);
        let body = json!({ "lease_id": lease_id });

        self.send_empty(self.request(Method::PUT, "sys/leases/revoke").json(&body), &what).await
    }
}

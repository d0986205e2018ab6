//! Resolves a [`CredentialConfig`] into concrete credentials.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::lease::LeaseState;
use super::mode::CredentialMode;
use crate::config::CredentialConfig;
use crate::connection::BackendKind;
use crate::errors::{Error, Result};
use crate::secrets::{SecretStore, SecretString};

/// Non-fatal problems found while loading static credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationWarning {
    EmptyUsername,
    EmptySecret,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => f.write_str("username is empty for static credential mode"),
            Self::EmptySecret => f.write_str("password is empty for static credential mode"),
        }
    }
}

/// Output of a successful load.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub username: String,
    pub secret: SecretString,
    /// Present only for vault-dynamic credentials
    pub lease: Option<LeaseState>,
    pub warnings: Vec<ValidationWarning>,
}

/// Loads credentials for one backend according to its credential mode.
///
/// Vault modes perform exactly one secret-store call per `load`; static mode
/// performs none.
#[derive(Clone)]
pub struct CredentialLoader {
    backend: String,
    kind: BackendKind,
    store: Option<Arc<dyn SecretStore>>,
}

impl fmt::Debug for CredentialLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialLoader")
            .field("backend", &self.backend)
            .field("kind", &self.kind)
            .field("store", &self.store.as_ref().map(|_| "[SecretStore]"))
            .finish()
    }
}

impl CredentialLoader {
    /// `store` may be `None` when only static credentials are used.
    pub fn new(
        backend: impl Into<String>,
        kind: BackendKind,
        store: Option<Arc<dyn SecretStore>>,
    ) -> Self {
        Self { backend: backend.into(), kind, store }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn store(&self) -> Option<&Arc<dyn SecretStore>> {
        self.store.as_ref()
    }

    pub async fn load(&self, config: &CredentialConfig) -> Result<ResolvedCredentials> {
        match config.mode {
            CredentialMode::Static => Ok(self.load_static(config)),
            CredentialMode::VaultSecret => self.load_vault_secret(config).await,
            CredentialMode::VaultDynamic => self.load_vault_dynamic(config).await,
        }
    }

    fn load_static(&self, config: &CredentialConfig) -> ResolvedCredentials {
        let mut warnings = Vec::new();
        if config.username.is_empty() && self.kind.requires_username() {
            warnings.push(ValidationWarning::EmptyUsername);
        }
        if config.password.is_empty() {
            warnings.push(ValidationWarning::EmptySecret);
        }

        for warning in &warnings {
            tracing::warn!(backend = %self.backend, "{}", warning);
        }
        tracing::info!(backend = %self.backend, "using static credentials from config file");

        ResolvedCredentials {
            username: config.username.clone(),
            secret: config.password.clone(),
            lease: None,
            warnings,
        }
    }

    async fn load_vault_secret(&self, config: &CredentialConfig) -> Result<ResolvedCredentials> {
        if config.secret_path.is_empty() {
            return Err(Error::config("vault_path is required for vault-secret mode"));
        }
        let store = self.require_store()?;
        let path = config.secret_path.as_str();

        let data = store.read_kv(path).await.map_err(|e| {
            tracing::error!(backend = %self.backend, path = %path, error = %e, "Failed to read secret");
            Error::from(e)
        })?;

        let username = match string_field(&data, &config.username_field) {
            Some(username) => username,
            None if !self.kind.requires_username() => String::new(),
            None => {
                return Err(Error::lookup(format!(
                    "field '{}' not found in vault secret at {}",
                    config.username_field, path
                )))
            }
        };

        let secret_field = config.secret_field_for(self.kind);
        let secret = string_field(&data, secret_field).ok_or_else(|| {
            Error::lookup(format!("field '{}' not found in vault secret at {}", secret_field, path))
        })?;

        tracing::info!(backend = %self.backend, path = %path, "loaded credentials from vault KV");

        Ok(ResolvedCredentials {
            username,
            secret: SecretString::new(secret),
            lease: None,
            warnings: Vec::new(),
        })
    }

    async fn load_vault_dynamic(&self, config: &CredentialConfig) -> Result<ResolvedCredentials> {
        if config.secret_path.is_empty() {
            return Err(Error::config("vault_path (role name) is required for vault-dynamic mode"));
        }
        let store = self.require_store()?;
        let role = config.secret_path.as_str();

        let leased = store.generate_dynamic_credentials(role).await.map_err(|e| {
            tracing::error!(backend = %self.backend, role = %role, error = %e, "Failed to generate dynamic credentials");
            Error::from(e)
        })?;

        let username = string_field(&leased.data, "username").ok_or_else(|| {
            Error::lookup(format!("username not found in dynamic credentials for role {}", role))
        })?;
        let password = string_field(&leased.data, "password").ok_or_else(|| {
            Error::lookup(format!("password not found in dynamic credentials for role {}", role))
        })?;

        let lease = LeaseState::from_leased(&leased);

        tracing::info!(
            backend = %self.backend,
            role = %role,
            lease_id = %lease.lease_id,
            ttl_seconds = lease.lease_duration_seconds,
            "generated vault dynamic credentials"
        );

        Ok(ResolvedCredentials {
            username,
            secret: SecretString::new(password),
            lease: Some(lease),
            warnings: Vec::new(),
        })
    }

    fn require_store(&self) -> Result<&Arc<dyn SecretStore>> {
        self.store.as_ref().ok_or_else(|| {
            Error::config("secret store client not initialized, please configure Vault")
        })
    }
}

/// A string-typed field, `None` when absent or of another JSON type.
fn string_field(data: &HashMap<String, Value>, field: &str) -> Option<String> {
    data.get(field).and_then(Value::as_str).map(str::to_string)
}

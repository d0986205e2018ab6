//! # Configuration Settings
//!
//! Credential configuration for one managed backend, plus logging settings.
//! Each backend owns its own [`CredentialConfig`] value; there is no global
//! registry. Field aliases accept the legacy `vault_*` key names.

use crate::connection::BackendKind;
use crate::credentials::CredentialMode;
use crate::errors::{Error, Result};
use crate::secrets::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

/// Credential configuration for a single backend connection
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CredentialConfig {
    /// Credential mode (static, vault-secret, vault-dynamic)
    #[serde(default, alias = "credential_mode")]
    pub mode: CredentialMode,

    /// Static-mode username
    #[serde(default)]
    pub username: String,

    /// Static-mode password or token
    #[serde(default)]
    pub password: SecretString,

    /// KV path (vault-secret) or role name (vault-dynamic)
    #[serde(default, alias = "vault_path")]
    pub secret_path: String,

    /// Field holding the username in the secret-store response
    #[serde(
        default = "default_username_field",
        alias = "vault_username_field",
        deserialize_with = "deserialize_username_field"
    )]
    pub username_field: String,

    /// Field holding the password/token; defaults depend on the backend kind
    #[serde(default, alias = "vault_password_field", deserialize_with = "deserialize_field_name")]
    pub secret_field: Option<String>,

    /// Renew dynamic leases in the background
    #[serde(default = "default_auto_renew", alias = "vault_auto_renew")]
    pub auto_renew: bool,

    /// Fraction of the lease duration after which renewal is attempted
    #[serde(default = "default_renew_threshold", alias = "vault_renew_threshold")]
    #[validate(range(
        min = 0.5,
        max = 0.95,
        message = "renew_threshold must be between 0.5 and 0.95"
    ))]
    pub renew_threshold: f64,

    /// How long a replaced connection may stay in use before it is closed (0 = close immediately)
    #[serde(default = "default_drain_timeout")]
    #[validate(range(max = 3600, message = "drain_timeout_seconds must be at most 3600"))]
    pub drain_timeout_seconds: u64,
}

fn default_username_field() -> String {
    "username".to_string()
}

/// A blank field name means "use the default".
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn deserialize_username_field<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(non_blank(value).unwrap_or_else(default_username_field))
}

fn deserialize_field_name<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Option::<String>::deserialize(deserializer).map(non_blank)
}

fn default_auto_renew() -> bool {
    true
}

fn default_renew_threshold() -> f64 {
    0.8
}

fn default_drain_timeout() -> u64 {
    30
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            mode: CredentialMode::Static,
            username: String::new(),
            password: SecretString::default(),
            secret_path: String::new(),
            username_field: default_username_field(),
            secret_field: None,
            auto_renew: default_auto_renew(),
            renew_threshold: default_renew_threshold(),
            drain_timeout_seconds: default_drain_timeout(),
        }
    }
}

impl CredentialConfig {
    /// Static credentials.
    pub fn static_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password),
            ..Default::default()
        }
    }

    /// Credentials read from a key-value secret at `path`.
    pub fn vault_secret(path: impl Into<String>) -> Self {
        Self { mode: CredentialMode::VaultSecret, secret_path: path.into(), ..Default::default() }
    }

    /// Dynamic credentials generated for `role`.
    pub fn vault_dynamic(role: impl Into<String>) -> Self {
        Self { mode: CredentialMode::VaultDynamic, secret_path: role.into(), ..Default::default() }
    }

    /// Validate the configuration. Every failure is a [`Error::Config`].
    pub fn validate(&self) -> Result<()> {
        // NaN slips through range checks
        if !self.renew_threshold.is_finite() {
            return Err(Error::config(format!(
                "renew_threshold must be between 0.5 and 0.95, got {}",
                self.renew_threshold
            )));
        }

        Validate::validate(self).map_err(|e| {
            Error::config(format!(
                "invalid credential configuration (renew_threshold={:.2}): {}",
                self.renew_threshold, e
            ))
        })?;

        if self.username_field.trim().is_empty() {
            return Err(Error::config("username_field cannot be empty"));
        }

        if matches!(self.secret_field.as_deref(), Some(field) if field.trim().is_empty()) {
            return Err(Error::config("secret_field cannot be empty when set"));
        }

        Ok(())
    }

    /// Secret field name for `kind`, honoring the override.
    pub fn secret_field_for(&self, kind: BackendKind) -> &str {
        self.secret_field.as_deref().unwrap_or_else(|| kind.default_secret_field())
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }

    /// Create a CredentialConfig from `{PREFIX}_*` environment variables.
    ///
    /// Reads `CREDENTIAL_MODE`, `USERNAME`, `PASSWORD`, `VAULT_PATH`,
    /// `VAULT_USERNAME_FIELD`, `VAULT_PASSWORD_FIELD`, `VAULT_AUTO_RENEW`,
    /// `VAULT_RENEW_THRESHOLD` and `DRAIN_TIMEOUT_SECONDS`. Unset variables
    /// keep their defaults, and so do blank field names. Values are not validated here; `validate` runs at
    /// manager init.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let var = |name: &str| std::env::var(format!("{}_{}", prefix, name)).ok();
        let defaults = Self::default();

        let mode = match var("CREDENTIAL_MODE") {
            Some(value) => value.parse()?,
            None => defaults.mode,
        };

        let auto_renew = match var("VAULT_AUTO_RENEW") {
            Some(value) => parse_bool(&format!("{}_VAULT_AUTO_RENEW", prefix), &value)?,
            None => defaults.auto_renew,
        };

        let renew_threshold = match var("VAULT_RENEW_THRESHOLD") {
            Some(value) => value.trim().parse::<f64>().map_err(|e| {
                Error::config(format!("Invalid {}_VAULT_RENEW_THRESHOLD: {}", prefix, e))
            })?,
            None => defaults.renew_threshold,
        };

        let drain_timeout_seconds = match var("DRAIN_TIMEOUT_SECONDS") {
            Some(value) => value.trim().parse::<u64>().map_err(|e| {
                Error::config(format!("Invalid {}_DRAIN_TIMEOUT_SECONDS: {}", prefix, e))
            })?,
            None => defaults.drain_timeout_seconds,
        };

        Ok(Self {
            mode,
            username: var("USERNAME").unwrap_or_default(),
            password: var("PASSWORD").map(SecretString::new).unwrap_or_default(),
            secret_path: var("VAULT_PATH").unwrap_or_default(),
            username_field: non_blank(var("VAULT_USERNAME_FIELD"))
                .unwrap_or(defaults.username_field),
            secret_field: non_blank(var("VAULT_PASSWORD_FIELD")),
            auto_renew,
            renew_threshold,
            drain_timeout_seconds,
        })
    }

    /// Load a CredentialConfig from a TOML file. Legacy `vault_*` keys are accepted.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(Error::config(format!("Invalid {}: expected a boolean, got '{}'", name, other))),
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl LoggingConfig {
    /// Create LoggingConfig from `CREDKEEPER_LOG_LEVEL` and `CREDKEEPER_LOG_JSON`
    pub fn from_env() -> Self {
        let log_level =
            std::env::var("CREDKEEPER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let json_logging = std::env::var("CREDKEEPER_LOG_JSON")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(false);

        Self { log_level, json_logging }
    }
}

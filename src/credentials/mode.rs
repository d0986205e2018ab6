//! Credential mode and the behavior flags derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// Where a backend's credentials come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum CredentialMode {
    /// Username and secret taken verbatim from configuration.
    #[default]
    Static,
    /// Username and secret read once from a key-value secret.
    VaultSecret,
    /// Credentials generated per process with a renewable lease.
    VaultDynamic,
}

impl CredentialMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::VaultSecret => "vault-secret",
            Self::VaultDynamic => "vault-dynamic",
        }
    }

    /// Whether loading in this mode talks to the secret store.
    pub const fn is_vault_mode(&self) -> bool {
        matches!(self, Self::VaultSecret | Self::VaultDynamic)
    }

    /// Whether credentials in this mode carry a lease that must be renewed.
    pub const fn needs_renewal(&self) -> bool {
        matches!(self, Self::VaultDynamic)
    }
}

impl fmt::Display for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            // legacy configs leave the mode unset
            "" | "static" => Ok(Self::Static),
            "vault-secret" => Ok(Self::VaultSecret),
            "vault-dynamic" => Ok(Self::VaultDynamic),
            other => Err(Error::config(format!("unsupported credential mode: {}", other))),
        }
    }
}

impl TryFrom<String> for CredentialMode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

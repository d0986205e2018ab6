//! Backend connection builder contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::credentials::ResolvedCredentials;
use crate::errors::{Error, Result};

/// Family of backend a connection talks to.
///
/// Drives the default secret field name and whether a username is mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// SQL databases (PostgreSQL, MySQL, SQLite)
    Relational,
    /// Key-value caches (Redis)
    Cache,
    /// Message brokers (NATS, RabbitMQ)
    MessageBroker,
    /// Document stores (MongoDB)
    DocumentStore,
}

impl BackendKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Cache => "cache",
            Self::MessageBroker => "message_broker",
            Self::DocumentStore => "document_store",
        }
    }

    /// Field name the secret is stored under when no override is configured.
    pub const fn default_secret_field(&self) -> &'static str {
        match self {
            Self::MessageBroker => "token",
            _ => "password",
        }
    }

    /// Whether a username must be present. Caches and brokers commonly
    /// authenticate with a password or token alone.
    pub const fn requires_username(&self) -> bool {
        matches!(self, Self::Relational | Self::DocumentStore)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "relational" | "postgres" | "postgresql" | "mysql" | "sqlite" => Ok(Self::Relational),
            "cache" | "redis" => Ok(Self::Cache),
            "message_broker" | "nats" | "rabbitmq" => Ok(Self::MessageBroker),
            "document_store" | "mongodb" | "mongo" => Ok(Self::DocumentStore),
            other => Err(Error::config(format!("unsupported backend kind: {}", other))),
        }
    }
}

/// Builds and tears down connection handles for one backend.
///
/// `connect` is called once at init and again on every regeneration; the
/// returned handle is shared read-only by all callers of
/// [`CredentialManager::connection`](crate::lifecycle::CredentialManager::connection).
/// Failures should be reported as [`Error::Connectivity`](crate::Error::Connectivity).
#[async_trait]
pub trait ConnectionBuilder: Send + Sync + 'static {
    type Connection: Send + Sync + 'static;

    fn kind(&self) -> BackendKind;

    async fn connect(&self, credentials: &ResolvedCredentials) -> Result<Self::Connection>;

    async fn close(&self, connection: &Self::Connection) -> Result<()>;
}

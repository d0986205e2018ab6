//! Secret store capability trait and response types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::error::Result;

/// Response of a dynamic credential generation call.
///
/// `data` carries the generated fields (for database engines: `username`
/// and `password`). The loader decides which of them are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeasedSecret {
    pub data: HashMap<String, Value>,
    pub lease_id: String,
    pub lease_duration_seconds: u64,
    #[serde(default)]
    pub renewable: bool,
}

/// Response of a lease renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRenewal {
    pub lease_id: String,
    pub lease_duration_seconds: u64,
}

/// Capabilities the credential loader and the renewal scheduler consume from
/// a secret store.
///
/// Every method is exactly one outbound call; implementations must not retry
/// internally, retry policy belongs to the scheduler.
///
/// # Security Considerations
///
/// - Implementations MUST NOT log secret values
/// - Error messages MUST NOT contain secret values
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a key-value secret at `path`.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotFound`](super::SecretsError::NotFound) if nothing is stored at `path`
    /// - [`SecretsError::ConnectionFailed`](super::SecretsError::ConnectionFailed) if the store is unreachable
    async fn read_kv(&self, path: &str) -> Result<HashMap<String, Value>>;

    /// Generate a fresh set of leased credentials for `role`.
    async fn generate_dynamic_credentials(&self, role: &str) -> Result<LeasedSecret>;

    /// Extend `lease_id` by `increment`.
    async fn renew_lease(&self, lease_id: &str, increment: Duration) -> Result<LeaseRenewal>;

    /// Revoke `lease_id`, invalidating the credentials it backs.
    async fn revoke_lease(&self, lease_id: &str) -> Result<()>;
}

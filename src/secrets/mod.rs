//! Secret store abstraction consumed by the credential loader.
//!
//! The [`SecretStore`] trait exposes the four capabilities the lifecycle
//! manager needs from a secret store:
//! - **read_kv**: read a key-value secret (vault-secret mode)
//! - **generate_dynamic_credentials**: issue leased credentials for a role (vault-dynamic mode)
//! - **renew_lease**: extend a lease before it expires
//! - **revoke_lease**: invalidate a lease at shutdown
//!
//! [`VaultSecretStore`] implements it against HashiCorp Vault.
//!
//! # Security Considerations
//!
//! - Secrets are never logged or exposed in error messages
//! - Passwords and tokens are carried as [`SecretString`]

pub mod client;
pub mod error;
pub mod types;
pub mod vault;

pub use client::{LeaseRenewal, LeasedSecret, SecretStore};
pub use error::{Result, SecretsError};
pub use types::SecretString;
pub use vault::{VaultConfig, VaultSecretStore};

//! # credkeeper
//!
//! Credential lifecycle management for long-lived backend connections
//! (relational stores, caches, message brokers, document stores).
//!
//! Credentials come from one of three modes:
//!
//! - **static**: username and secret taken from configuration
//! - **vault-secret**: read once from a HashiCorp Vault KV v2 secret
//! - **vault-dynamic**: generated per process by a Vault secrets engine, with a
//!   lease that is renewed in the background and revoked on shutdown
//!
//! ## Architecture
//!
//! ```text
//! CredentialConfig → CredentialLoader → ConnectionBuilder → ConnectionSwapper
//!                          ↑                                      ↑
//!                     SecretStore ← RenewalScheduler (renew / regenerate)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use credkeeper::{
//!     CredentialConfig, CredentialManager, PostgresConnectionBuilder, PostgresParams,
//!     Result, SecretStore, VaultSecretStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store: Option<Arc<dyn SecretStore>> = match VaultSecretStore::from_env().await? {
//!         Some(store) => Some(Arc::new(store)),
//!         None => None,
//!     };
//!     let config = CredentialConfig::from_env("ORDERS_DB")?;
//!     let builder = PostgresConnectionBuilder::new(PostgresParams::from_env("ORDERS_DB")?);
//!
//!     let manager = CredentialManager::init("orders-db", config, store, builder).await?;
//!     let pool = manager.connection();
//!     sqlx::query("SELECT 1").execute(&*pool).await.ok();
//!
//!     manager.close().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod errors;
pub mod lifecycle;
pub mod observability;
pub mod secrets;

// Re-export commonly used types and traits
pub use config::{CredentialConfig, LoggingConfig};
pub use connection::{BackendKind, ConnectionBuilder, PostgresConnectionBuilder, PostgresParams};
pub use credentials::{
    CredentialLoader, CredentialMode, LeaseState, ResolvedCredentials, ValidationWarning,
};
pub use errors::{Error, Result};
pub use lifecycle::{
    ConnectionHandle, CredentialManager, ManagerStatus, SchedulerState, ShutdownReport,
};
pub use observability::init_logging;
pub use secrets::{SecretStore, SecretString, SecretsError, VaultConfig, VaultSecretStore};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

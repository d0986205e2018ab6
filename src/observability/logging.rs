//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//!
//! Field names are shared across the crate: `backend`, `mode`, `lease_id`,
//! `ttl_seconds`, `generation` and `error`. Secret values are never recorded.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{CredentialConfig, LoggingConfig};
use crate::errors::{Error, Result};

/// Create a tracing span for one lease operation (renew, regenerate, revoke).
///
/// ```rust,ignore
/// let span = lease_span!("renew", "orders-db");
/// let span = lease_span!("renew", "orders-db", lease_id = %lease.lease_id);
/// ```
#[macro_export]
macro_rules! lease_span {
    ($operation:expr, $backend:expr) => {
        tracing::info_span!(
            "lease_operation",
            operation = %$operation,
            backend = %$backend,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $backend:expr, $($field:tt)*) => {
        tracing::info_span!(
            "lease_operation",
            operation = %$operation,
            backend = %$backend,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level`. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let installed = if config.json_logging {
        tracing::subscriber::set_global_default(
            fmt().json().with_env_filter(filter).with_current_span(true).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(fmt().with_env_filter(filter).finish())
    };

    if installed.is_err() {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
        tracing::debug!("global tracing subscriber already installed");
    }
    Ok(())
}

/// Log the effective credential settings of a backend at startup.
pub fn log_manager_started(backend: &str, config: &CredentialConfig) {
    tracing::info!(
        backend = %backend,
        mode = %config.mode,
        secret_path = %config.secret_path,
        auto_renew = config.auto_renew,
        renew_threshold = config.renew_threshold,
        drain_timeout_seconds = config.drain_timeout_seconds,
        "credential manager configuration"
    );
}

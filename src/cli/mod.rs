//! # Command Line Interface
//!
//! `credkeeper check` resolves a backend's credentials once and prints a
//! redacted summary. `credkeeper run` keeps a PostgreSQL connection alive under
//! a [`CredentialManager`] until interrupted.

pub mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use self::output::{print_output, OutputFormat};
use crate::config::{CredentialConfig, LoggingConfig};
use crate::connection::{BackendKind, PostgresConnectionBuilder, PostgresParams};
use crate::credentials::{CredentialLoader, CredentialMode};
use crate::lifecycle::CredentialManager;
use crate::observability::init_logging;
use crate::secrets::{SecretStore, VaultSecretStore};

#[derive(Parser)]
#[command(name = "credkeeper")]
#[command(about = "Credential lifecycle manager for backend connections")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (json or table)
    #[arg(short, long, global = true, default_value = "json")]
    pub output: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve credentials once and print a redacted summary
    Check {
        /// Environment variable prefix, e.g. DB reads DB_CREDENTIAL_MODE
        #[arg(long, default_value = "DB")]
        prefix: String,

        /// Read credential settings from a TOML file instead of the environment
        #[arg(long)]
        config: Option<PathBuf>,

        /// Backend kind (relational, cache, message_broker, document_store)
        #[arg(long, default_value = "relational")]
        backend: BackendKind,

        /// Do not revoke a dynamic lease issued by the check
        #[arg(long)]
        keep_lease: bool,
    },

    /// Run a PostgreSQL-backed credential manager until Ctrl-C
    Run {
        /// Environment variable prefix for credential and connection settings
        #[arg(long, default_value = "DB")]
        prefix: String,

        /// Read credential settings from a TOML file instead of the environment
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log manager status every N seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        status_interval: Option<u64>,
    },
}

/// Redacted result of `credkeeper check`
#[derive(Debug, Serialize)]
pub struct CheckSummary {
    pub backend: BackendKind,
    pub mode: CredentialMode,
    pub username: String,
    pub secret_length: usize,
    pub lease_id: Option<String>,
    pub ttl_seconds: Option<u64>,
    pub renewable: Option<bool>,
    pub lease_revoked: Option<bool>,
    pub warnings: Vec<String>,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging.log_level = "debug".to_string();
    }
    init_logging(&logging)?;

    match cli.command {
        Commands::Check { prefix, config, backend, keep_lease } => {
            let config = load_config(&prefix, config.as_deref())?;
            let summary = check_credentials(&prefix, config, backend, keep_lease).await?;
            print_output(&summary, cli.output)?;
        }
        Commands::Run { prefix, config, status_interval } => {
            let config = load_config(&prefix, config.as_deref())?;
            run_manager(&prefix, config, status_interval.map(Duration::from_secs), cli.output)
                .await?;
        }
    }

    Ok(())
}

fn load_config(prefix: &str, file: Option<&Path>) -> crate::Result<CredentialConfig> {
    match file {
        Some(path) => CredentialConfig::from_toml_file(path),
        None => CredentialConfig::from_env(prefix),
    }
}

/// Connect to Vault from `VAULT_*` variables, only when the mode needs it.
async fn secret_store_for(config: &CredentialConfig) -> anyhow::Result<Option<Arc<dyn SecretStore>>> {
    if !config.mode.is_vault_mode() {
        return Ok(None);
    }

    let store = VaultSecretStore::from_env()
        .await
        .context("Failed to connect to Vault")?
        .context("VAULT_ADDR must be set for vault credential modes")?;
    Ok(Some(Arc::new(store)))
}

async fn check_credentials(
    prefix: &str,
    config: CredentialConfig,
    backend: BackendKind,
    keep_lease: bool,
) -> anyhow::Result<CheckSummary> {
    config.validate()?;

    let store = secret_store_for(&config).await?;
    let loader = CredentialLoader::new(prefix, backend, store.clone());
    let credentials = loader.load(&config).await?;

    let mut lease_revoked = None;
    if let (Some(lease), Some(store), false) = (&credentials.lease, &store, keep_lease) {
        lease_revoked = Some(match store.revoke_lease(&lease.lease_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(lease_id = %lease.lease_id, error = %e, "Failed to revoke check lease");
                false
            }
        });
    }

    Ok(CheckSummary {
        backend,
        mode: config.mode,
        username: credentials.username.clone(),
        secret_length: credentials.secret.len(),
        lease_id: credentials.lease.as_ref().map(|l| l.lease_id.clone()),
        ttl_seconds: credentials.lease.as_ref().map(|l| l.lease_duration_seconds),
        renewable: credentials.lease.as_ref().map(|l| l.renewable),
        lease_revoked,
        warnings: credentials.warnings.iter().map(ToString::to_string).collect(),
    })
}

async fn run_manager(
    prefix: &str,
    config: CredentialConfig,
    status_interval: Option<Duration>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let params = PostgresParams::from_env(prefix)?;
    let store = secret_store_for(&config).await?;

    let manager =
        CredentialManager::init(prefix, config, store, PostgresConnectionBuilder::new(params))
            .await
            .context("Failed to initialize credential manager")?;

    print_output(&manager.status(), output)?;

    let mut ticker = status_interval.map(|period| {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker
    });

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for shutdown signal")?;
                tracing::info!(backend = %prefix, "shutdown signal received");
                break;
            }
            _ = async {
                match ticker.as_mut() {
                    Some(ticker) => { ticker.tick().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {
                let status = manager.status();
                tracing::info!(
                    backend = %status.backend,
                    scheduler = %status.scheduler,
                    generation = status.generation,
                    lease_id = status.lease_id.as_deref().unwrap_or(""),
                    renewals = status.renewals,
                    regenerations = status.regenerations,
                    "credential manager status"
                );
            }
        }
    }

    let report = manager.close().await;
    print_output(&report, output)?;
    Ok(())
}

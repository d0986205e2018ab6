//! # PostgreSQL Connection Builder
//!
//! Relational-store [`ConnectionBuilder`] producing a `sqlx` connection pool
//! from resolved credentials.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;

use super::builder::{BackendKind, ConnectionBuilder};
use crate::credentials::ResolvedCredentials;
use crate::errors::{Error, Result};

/// Connection parameters that do not depend on credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
}

impl Default for PostgresParams {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 5,
        }
    }
}

impl PostgresParams {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Create PostgresParams from `{PREFIX}_HOST`, `_PORT`, `_DB`,
    /// `_MAX_CONNECTIONS`, `_MIN_CONNECTIONS` and `_CONNECT_TIMEOUT_SECONDS`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let var = |name: &str| std::env::var(format!("{}_{}", prefix, name)).ok();
        let defaults = Self::default();

        fn parse<T: std::str::FromStr>(name: String, value: Option<String>, default: T) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            match value {
                Some(v) => v
                    .trim()
                    .parse::<T>()
                    .map_err(|e| Error::config(format!("Invalid {}: {}", name, e))),
                None => Ok(default),
            }
        }

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse(format!("{}_PORT", prefix), var("PORT"), defaults.port)?,
            database: var("DB").unwrap_or(defaults.database),
            max_connections: parse(
                format!("{}_MAX_CONNECTIONS", prefix),
                var("MAX_CONNECTIONS"),
                defaults.max_connections,
            )?,
            min_connections: parse(
                format!("{}_MIN_CONNECTIONS", prefix),
                var("MIN_CONNECTIONS"),
                defaults.min_connections,
            )?,
            connect_timeout_seconds: parse(
                format!("{}_CONNECT_TIMEOUT_SECONDS", prefix),
                var("CONNECT_TIMEOUT_SECONDS"),
                defaults.connect_timeout_seconds,
            )?,
        })
    }

    /// Connection URL with the password masked, for logs.
    pub fn redacted_url(&self, username: &str) -> String {
        self.parsed_url(username).unwrap_or_else(|| {
            let userinfo =
                if username.is_empty() { String::new() } else { format!("{}:***@", username) };
            format!("postgresql://{}{}:{}/{}", userinfo, self.host, self.port, self.database)
        })
    }

    fn parsed_url(&self, username: &str) -> Option<String> {
        let mut parsed =
            url::Url::parse(&format!("postgresql://{}:5432/{}", self.host, self.database)).ok()?;
        parsed.set_port(Some(self.port)).ok()?;
        if !username.is_empty() {
            parsed.set_username(username).ok()?;
            parsed.set_password(Some("***")).ok()?;
        }
        Some(parsed.to_string())
    }
}

/// Builds `sqlx` PostgreSQL pools.
///
/// The pool connects eagerly so that bad credentials fail at init (or
/// during regeneration) rather than on first use.
#[derive(Debug, Clone)]
pub struct PostgresConnectionBuilder {
    params: PostgresParams,
}

impl PostgresConnectionBuilder {
    pub fn new(params: PostgresParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PostgresParams {
        &self.params
    }
}

#[async_trait]
impl ConnectionBuilder for PostgresConnectionBuilder {
    type Connection = PgPool;

    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    async fn connect(&self, credentials: &ResolvedCredentials) -> Result<PgPool> {
        let target = self.params.redacted_url(&credentials.username);

        let connect_options = PgConnectOptions::new()
            .host(&self.params.host)
            .port(self.params.port)
            .database(&self.params.database)
            .username(&credentials.username)
            .password(credentials.secret.expose_secret());

        let pool = PgPoolOptions::new()
            .max_connections(self.params.max_connections)
            .min_connections(self.params.min_connections)
            .acquire_timeout(self.params.connect_timeout())
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %target, "Failed to create PostgreSQL pool");
                Error::connectivity_with_source(
                    format!("Failed to connect to database: {}", target),
                    Box::new(e),
                )
            })?;

        tracing::info!(
            url = %target,
            max_connections = self.params.max_connections,
            connect_timeout_ms = self.params.connect_timeout().as_millis(),
            "PostgreSQL connection pool created"
        );

        Ok(pool)
    }

    async fn close(&self, connection: &PgPool) -> Result<()> {
        connection.close().await;
        tracing::info!(host = %self.params.host, database = %self.params.database, "PostgreSQL pool closed");
        Ok(())
    }
}

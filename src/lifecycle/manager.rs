//! # Credential Manager
//!
//! Owns the credential lifecycle of one backend connection: initial load and
//! connect, background lease renewal, regeneration with connection swap, and
//! ordered shutdown.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::Instrument;

use super::keeper::LeaseKeeper;
use super::scheduler::{RenewalScheduler, RenewalTask, SchedulerState};
use super::shutdown::{ShutdownCoordinator, ShutdownReport};
use super::swapper::{ConnectionHandle, ConnectionSwapper};
use crate::config::CredentialConfig;
use crate::connection::{BackendKind, ConnectionBuilder};
use crate::credentials::{CredentialLoader, CredentialMode, LeaseState};
use crate::errors::Result;
use crate::observability::log_manager_started;
use crate::secrets::SecretStore;

/// Point-in-time view of a manager, suitable for health endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerStatus {
    pub backend: String,
    pub kind: BackendKind,
    pub mode: CredentialMode,
    pub scheduler: SchedulerState,
    pub renewal_interval_seconds: Option<u64>,
    pub lease_id: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub generation: u64,
    pub renewals: u64,
    pub renewal_failures: u64,
    pub regenerations: u64,
    pub failed_regenerations: u64,
    pub closed: bool,
}

#[derive(Debug, Default)]
struct Counters {
    renewals: AtomicU64,
    renewal_failures: AtomicU64,
    regenerations: AtomicU64,
    failed_regenerations: AtomicU64,
}

struct ManagerInner<B: ConnectionBuilder> {
    backend: String,
    config: CredentialConfig,
    loader: CredentialLoader,
    leases: LeaseKeeper,
    swapper: ConnectionSwapper<B>,
    counters: Counters,
}

impl<B: ConnectionBuilder> ManagerInner<B> {
    async fn renew(&self, lease: &LeaseState) {
        match self.leases.renew(lease).await {
            Ok(renewed) => {
                self.counters.renewals.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    backend = %self.backend,
                    lease_id = %renewed.lease_id,
                    ttl_seconds = renewed.lease_duration_seconds,
                    "renewed vault lease"
                );
            }
            Err(e) => {
                self.counters.renewal_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    backend = %self.backend,
                    lease_id = %lease.lease_id,
                    error = %e,
                    "Failed to renew lease, regenerating credentials"
                );

                if let Err(e) = self.regenerate().await {
                    self.counters.failed_regenerations.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        backend = %self.backend,
                        generation = self.swapper.generation(),
                        error = %e,
                        "Failed to regenerate credentials, keeping existing connection"
                    );
                }
            }
        }
    }

    /// Load fresh credentials, connect with them and swap the new connection in.
    ///
    /// On any failure the current connection and lease stay untouched.
    async fn regenerate(&self) -> Result<u64> {
        let credentials = self.loader.load(&self.config).await?;

        let connection = match self.swapper.builder().connect(&credentials).await {
            Ok(connection) => connection,
            Err(e) => {
                if let Some(lease) = &credentials.lease {
                    self.leases.revoke_untracked(&lease.lease_id).await;
                }
                return Err(e);
            }
        };

        let new_lease_id = credentials.lease.as_ref().map(|l| l.lease_id.clone());
        let (generation, retired) = self.swapper.install(connection);
        self.leases.replace(credentials.lease);
        self.counters.regenerations.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            backend = %self.backend,
            generation,
            lease_id = new_lease_id.as_deref().unwrap_or(""),
            "regenerated credentials"
        );

        // The old connection is closed only after the new one is live
        if let Err(e) = self.swapper.retire(retired).await {
            tracing::warn!(backend = %self.backend, error = %e, "retired connection did not close cleanly");
        }
        Ok(generation)
    }
}

#[async_trait]
impl<B: ConnectionBuilder> RenewalTask for ManagerInner<B> {
    async fn on_tick(&self) {
        let Some(lease) = self.leases.snapshot() else {
            tracing::debug!(backend = %self.backend, "no lease to renew");
            return;
        };

        let span = crate::lease_span!("renew", self.backend, lease_id = %lease.lease_id);
        self.renew(&lease).instrument(span).await;
    }
}

/// Credential lifecycle for one backend.
///
/// Created with [`CredentialManager::init`], which returns only once
/// credentials are loaded and the first connection is live. Call
/// [`CredentialManager::close`] on shutdown to revoke any dynamic lease.
pub struct CredentialManager<B: ConnectionBuilder> {
    inner: Arc<ManagerInner<B>>,
    scheduler: RenewalScheduler,
    shutdown: ShutdownCoordinator,
}

impl<B: ConnectionBuilder> CredentialManager<B> {
    /// Validate `config`, load credentials, build the first connection and
    /// start lease renewal when it applies.
    ///
    /// Vault modes need `store`; static mode ignores it.
    pub async fn init(
        backend: impl Into<String>,
        config: CredentialConfig,
        store: Option<Arc<dyn SecretStore>>,
        builder: B,
    ) -> Result<Self> {
        let backend = backend.into();
        config.validate()?;
        log_manager_started(&backend, &config);

        let builder = Arc::new(builder);
        let loader = CredentialLoader::new(backend.clone(), builder.kind(), store.clone());
        let credentials = loader.load(&config).await?;
        let leases = LeaseKeeper::new(backend.clone(), store, credentials.lease.clone());

        let connection = match builder.connect(&credentials).await {
            Ok(connection) => connection,
            Err(e) => {
                // Nothing will ever use this lease
                leases.revoke_current().await;
                return Err(e);
            }
        };

        let swapper = ConnectionSwapper::new(
            backend.clone(),
            builder,
            connection,
            config.drain_timeout(),
        );

        let interval = credentials.lease.as_ref().and_then(|lease| {
            if config.mode.needs_renewal() && config.auto_renew {
                lease.renewal_interval(config.renew_threshold)
            } else {
                None
            }
        });

        let inner = Arc::new(ManagerInner {
            backend: backend.clone(),
            config,
            loader,
            leases,
            swapper,
            counters: Counters::default(),
        });

        let scheduler = match interval {
            Some(interval) => RenewalScheduler::start(backend.clone(), interval, inner.clone()),
            None => {
                if inner.config.mode.needs_renewal() {
                    tracing::info!(
                        backend = %backend,
                        auto_renew = inner.config.auto_renew,
                        "lease renewal disabled for this backend"
                    );
                }
                RenewalScheduler::idle(backend.clone())
            }
        };

        Ok(Self { inner, scheduler, shutdown: ShutdownCoordinator::new(backend) })
    }

    pub fn backend(&self) -> &str {
        &self.inner.backend
    }

    pub fn config(&self) -> &CredentialConfig {
        &self.inner.config
    }

    /// The current connection. Cheap; clone or drop freely.
    pub fn connection(&self) -> ConnectionHandle<B::Connection> {
        self.inner.swapper.current()
    }

    pub fn lease(&self) -> Option<LeaseState> {
        self.inner.leases.snapshot()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }

    pub fn status(&self) -> ManagerStatus {
        let lease = self.inner.leases.snapshot();
        let counters = &self.inner.counters;
        ManagerStatus {
            backend: self.inner.backend.clone(),
            kind: self.inner.loader.kind(),
            mode: self.inner.config.mode,
            scheduler: self.scheduler.state(),
            renewal_interval_seconds: self.scheduler.interval().map(|i| i.as_secs()),
            lease_id: lease.as_ref().map(|l| l.lease_id.clone()),
            lease_expires_at: lease.as_ref().map(LeaseState::expires_at),
            generation: self.inner.swapper.generation(),
            renewals: counters.renewals.load(Ordering::Relaxed),
            renewal_failures: counters.renewal_failures.load(Ordering::Relaxed),
            regenerations: counters.regenerations.load(Ordering::Relaxed),
            failed_regenerations: counters.failed_regenerations.load(Ordering::Relaxed),
            closed: self.shutdown.is_closed(),
        }
    }

    /// Stop background renewal without releasing anything. Safe to call
    /// repeatedly and before [`close`](Self::close).
    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    /// Stop renewal, revoke the dynamic lease and close the connection.
    ///
    /// A second call does nothing and returns an empty report.
    pub async fn close(&self) -> ShutdownReport {
        self.shutdown
            .close(&self.scheduler, &self.inner.leases, &self.inner.swapper)
            .await
            .unwrap_or_default()
    }
}

impl<B: ConnectionBuilder> fmt::Debug for CredentialManager<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("backend", &self.inner.backend)
            .field("mode", &self.inner.config.mode)
            .field("scheduler", &self.scheduler)
            .field("closed", &self.shutdown.is_closed())
            .finish()
    }
}

//! # Ordered Shutdown
//!
//! Stops the renewal loop, revokes the live lease and closes the current
//! connection, in that order, exactly once per manager.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use super::keeper::LeaseKeeper;
use super::scheduler::RenewalScheduler;
use super::swapper::ConnectionSwapper;
use crate::connection::ConnectionBuilder;

/// What a call to `close` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// A running renewal loop was stopped by this close.
    pub scheduler_stopped: bool,
    /// `None` when there was no lease to revoke.
    pub lease_revoked: Option<bool>,
    pub connection_closed: bool,
}

#[derive(Debug)]
pub struct ShutdownCoordinator {
    backend: String,
    closed: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(backend: impl Into<String>) -> Self {
        Self { backend: backend.into(), closed: AtomicBool::new(false) }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Run the shutdown sequence. Returns `None` when it already ran.
    pub async fn close<B: ConnectionBuilder>(
        &self,
        scheduler: &RenewalScheduler,
        leases: &LeaseKeeper,
        swapper: &ConnectionSwapper<B>,
    ) -> Option<ShutdownReport> {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(backend = %self.backend, "credential manager already closed");
            return None;
        }

        let scheduler_stopped = scheduler.stop().await;
        let lease_revoked = leases.revoke_current().await;

        let connection_closed = match swapper.close_current().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(backend = %self.backend, error = %e, "Failed to close connection");
                false
            }
        };

        let report = ShutdownReport { scheduler_stopped, lease_revoked, connection_closed };
        tracing::info!(
            backend = %self.backend,
            scheduler_stopped,
            lease_revoked = ?lease_revoked,
            connection_closed,
            "credential manager closed"
        );
        Some(report)
    }
}

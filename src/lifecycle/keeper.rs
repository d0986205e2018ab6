//! Ownership of the live lease and the secret-store calls that act on it.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::credentials::LeaseState;
use crate::errors::{Error, Result};
use crate::secrets::SecretStore;

/// Holds the lease backing the current connection.
///
/// A lease is only ever present for vault-dynamic credentials. Revocation
/// takes the lease out first so it can never be revoked twice.
pub struct LeaseKeeper {
    backend: String,
    store: Option<Arc<dyn SecretStore>>,
    current: Mutex<Option<LeaseState>>,
}

impl LeaseKeeper {
    pub fn new(
        backend: impl Into<String>,
        store: Option<Arc<dyn SecretStore>>,
        lease: Option<LeaseState>,
    ) -> Self {
        Self { backend: backend.into(), store, current: Mutex::new(lease) }
    }

    pub fn snapshot(&self) -> Option<LeaseState> {
        self.current.lock().clone()
    }

    pub fn replace(&self, lease: Option<LeaseState>) -> Option<LeaseState> {
        std::mem::replace(&mut *self.current.lock(), lease)
    }

    /// Extend `lease` by its current duration and record the result.
    ///
    /// The stored lease is only updated when it is still the one that was
    /// renewed.
    pub async fn renew(&self, lease: &LeaseState) -> Result<LeaseState> {
        let store = self.store()?;
        let renewal = store.renew_lease(&lease.lease_id, lease.lease_duration()).await?;

        let mut current = self.current.lock();
        match current.as_mut() {
            Some(live) if live.lease_id == lease.lease_id => {
                live.apply_renewal(&renewal);
                Ok(live.clone())
            }
            _ => {
                let mut renewed = lease.clone();
                renewed.apply_renewal(&renewal);
                Ok(renewed)
            }
        }
    }

    /// Revoke a lease that is not (or no longer) tracked, logging failures.
    pub async fn revoke_untracked(&self, lease_id: &str) -> bool {
        match self.revoke(lease_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(backend = %self.backend, lease_id = %lease_id, error = %e, "Failed to revoke lease");
                false
            }
        }
    }

    /// Revoke the tracked lease, if any.
    ///
    /// `None` when there was nothing to revoke, otherwise whether the store
    /// accepted the revocation. The lease is cleared either way.
    pub async fn revoke_current(&self) -> Option<bool> {
        let lease = self.current.lock().take()?;
        if lease.lease_id.is_empty() {
            return None;
        }

        let revoked = self.revoke_untracked(&lease.lease_id).await;
        if revoked {
            tracing::info!(backend = %self.backend, lease_id = %lease.lease_id, "revoked vault lease");
        }
        Some(revoked)
    }

    async fn revoke(&self, lease_id: &str) -> Result<()> {
        self.store()?.revoke_lease(lease_id).await.map_err(Error::from)
    }

    fn store(&self) -> Result<&Arc<dyn SecretStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| Error::config("secret store client not initialized, cannot manage lease"))
    }
}

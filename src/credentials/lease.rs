//! Lease bookkeeping for dynamically generated credentials.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::secrets::{LeaseRenewal, LeasedSecret};

/// The lease backing the live dynamic credentials.
///
/// Created on the first successful vault-dynamic load, replaced wholesale on
/// regeneration and updated in place on renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseState {
    pub lease_id: String,
    pub lease_duration_seconds: u64,
    pub renewable: bool,
    /// When the current duration started counting
    pub obtained_at: DateTime<Utc>,
}

impl LeaseState {
    pub fn from_leased(secret: &LeasedSecret) -> Self {
        Self {
            lease_id: secret.lease_id.clone(),
            lease_duration_seconds: secret.lease_duration_seconds,
            renewable: secret.renewable,
            obtained_at: Utc::now(),
        }
    }

    /// Record a successful renewal. The lease id is kept unless the store reports a new one.
    pub fn apply_renewal(&mut self, renewal: &LeaseRenewal) {
        if !renewal.lease_id.is_empty() {
            self.lease_id.clone_from(&renewal.lease_id);
        }
        self.lease_duration_seconds = renewal.lease_duration_seconds;
        self.obtained_at = Utc::now();
    }

    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_duration_seconds)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.lease_duration_seconds).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs)
            .and_then(|ttl| self.obtained_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Interval between renewal attempts: the whole seconds of
    /// `lease_duration * threshold`, at least one second.
    ///
    /// `None` for a zero-length lease, which cannot be renewed on a schedule.
    pub fn renewal_interval(&self, threshold: f64) -> Option<Duration> {
        if self.lease_duration_seconds == 0 {
            return None;
        }
        let secs = (self.lease_duration_seconds as f64 * threshold).floor() as u64;
        Some(Duration::from_secs(secs.max(1)))
    }
}

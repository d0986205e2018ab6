//! Timing tests for background lease renewal, run on a paused tokio clock.

mod common;

use common::{EventLog, MockStore, RecordingBuilder};
use credkeeper::{CredentialConfig, CredentialManager, SchedulerState};
use std::sync::Arc;
use std::time::Duration;

async fn manager_with_lease(
    lease_seconds: u64,
    threshold: f64,
) -> (Arc<MockStore>, CredentialManager<RecordingBuilder>) {
    let events = EventLog::default();
    let store = Arc::new(MockStore::new(events.clone()).with_lease_duration(lease_seconds));
    let config = CredentialConfig { renew_threshold: threshold, ..CredentialConfig::vault_dynamic("app") };

    let manager = CredentialManager::init(
        "orders-db",
        config,
        store.clone().into_dyn(),
        RecordingBuilder::new(events),
    )
    .await
    .unwrap();
    (store, manager)
}

#[tokio::test(start_paused = true)]
async fn test_first_renewal_at_threshold_not_before() {
    let (store, manager) = manager_with_lease(3600, 0.8).await;

    tokio::time::sleep(Duration::from_secs(2879)).await;
    assert_eq!(store.calls("renew_start"), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(store.calls("renew_start"), 1);

    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_interval_is_not_recomputed_after_renewal() {
    // Every renewal reports the same duration, so the cadence must stay at
    // the interval computed from the initial lease.
    let (store, manager) = manager_with_lease(100, 0.5).await;
    assert_eq!(manager.status().renewal_interval_seconds, Some(50));

    tokio::time::sleep(Duration::from_secs(201)).await;
    assert_eq!(store.calls("renew_start"), 4);

    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_short_lease_ticks_every_second() {
    let (store, manager) = manager_with_lease(1, 0.5).await;
    assert_eq!(manager.status().renewal_interval_seconds, Some(1));

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(store.calls("renew_start"), 3);

    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_close() {
    let (store, manager) = manager_with_lease(60, 0.5).await;

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(store.calls("renew_start"), 1);

    let report = manager.close().await;
    assert!(report.scheduler_stopped);
    assert_eq!(manager.scheduler_state(), SchedulerState::Stopped);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(store.calls("renew_start"), 1);
}

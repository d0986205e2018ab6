//! Live PostgreSQL tests. Run with `cargo test --features postgres_tests` and
//! `CREDKEEPER_TEST_PG_HOST`, `_PORT`, `_DB`, `_USERNAME`, `_PASSWORD` set.

#![cfg(feature = "postgres_tests")]

use credkeeper::{
    CredentialConfig, CredentialManager, PostgresConnectionBuilder, PostgresParams, SchedulerState,
};

const PREFIX: &str = "CREDKEEPER_TEST_PG";

#[tokio::test]
async fn test_static_credentials_against_live_postgres() {
    let params = PostgresParams::from_env(PREFIX).unwrap();
    let config = CredentialConfig::from_env(PREFIX).unwrap();

    let manager =
        CredentialManager::init("live-pg", config, None, PostgresConnectionBuilder::new(params))
            .await
            .unwrap();
    assert_eq!(manager.scheduler_state(), SchedulerState::Idle);

    let pool = manager.connection();
    let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*pool).await.unwrap();
    assert_eq!(row.0, 1);
    drop(pool);

    let report = manager.close().await;
    assert!(report.connection_closed);
    assert!(manager.connection().is_closed());
}

#[tokio::test]
async fn test_wrong_password_is_connectivity_error() {
    let params = PostgresParams::from_env(PREFIX).unwrap();
    let config = CredentialConfig::static_credentials("credkeeper_nobody", "wrong-password");

    let err =
        CredentialManager::init("live-pg", config, None, PostgresConnectionBuilder::new(params))
            .await
            .unwrap_err();
    assert!(err.is_connectivity());
}

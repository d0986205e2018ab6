//! Common test utilities for all integration tests.
//!
//! Provides an in-memory secret store and a recording connection builder that
//! log every call into a shared [`EventLog`], so tests can assert ordering.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use async_trait::async_trait;
use credkeeper::secrets::{LeaseRenewal, LeasedSecret, Result as SecretsResult};
use credkeeper::{
    BackendKind, ConnectionBuilder, Error, ResolvedCredentials, Result, SecretStore, SecretsError,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Ordered record of store and builder calls, shared between mocks.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == event)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0.lock().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// Pauses `renew_lease` until the test releases it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// In-memory [`SecretStore`].
///
/// Dynamic credentials are numbered: the n-th generation for role `app`
/// returns username `v-app-n` and lease id `database/creds/app/n`.
pub struct MockStore {
    pub events: EventLog,
    kv: Mutex<HashMap<String, HashMap<String, Value>>>,
    lease_duration_seconds: u64,
    generated: AtomicUsize,
    pub fail_renew: AtomicBool,
    pub fail_generate: AtomicBool,
    renew_gate: Mutex<Option<Arc<Gate>>>,
}

impl MockStore {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            kv: Mutex::new(HashMap::new()),
            lease_duration_seconds: 3600,
            generated: AtomicUsize::new(0),
            fail_renew: AtomicBool::new(false),
            fail_generate: AtomicBool::new(false),
            renew_gate: Mutex::new(None),
        }
    }

    pub fn with_lease_duration(mut self, seconds: u64) -> Self {
        self.lease_duration_seconds = seconds;
        self
    }

    pub fn with_kv(self, path: &str, data: Value) -> Self {
        let fields = data.as_object().cloned().unwrap_or_default().into_iter().collect();
        self.kv.lock().insert(path.to_string(), fields);
        self
    }

    pub fn gate_renewals(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.renew_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn calls(&self, method: &str) -> usize {
        self.events.count_prefix(&format!("{}:", method))
    }

    pub fn into_dyn(self: Arc<Self>) -> Option<Arc<dyn SecretStore>> {
        Some(self)
    }
}

#[async_trait]
impl SecretStore for MockStore {
    async fn read_kv(&self, path: &str) -> SecretsResult<HashMap<String, Value>> {
        self.events.push(format!("read_kv:{}", path));
        self.kv.lock().get(path).cloned().ok_or_else(|| SecretsError::not_found(path))
    }

    async fn generate_dynamic_credentials(&self, role: &str) -> SecretsResult<LeasedSecret> {
        if self.fail_generate.load(Ordering::SeqCst) {
            self.events.push(format!("generate:{}:failed", role));
            return Err(SecretsError::connection_failed("vault unreachable"));
        }

        let n = self.generated.fetch_add(1, Ordering::SeqCst) + 1;
        let lease_id = format!("database/creds/{}/{}", role, n);
        self.events.push(format!("generate:{}", lease_id));

        let data = json!({"username": format!("v-{}-{}", role, n), "password": format!("pw-{}", n)});
        Ok(LeasedSecret {
            data: data.as_object().cloned().unwrap_or_default().into_iter().collect(),
            lease_id,
            lease_duration_seconds: self.lease_duration_seconds,
            renewable: true,
        })
    }

    async fn renew_lease(&self, lease_id: &str, increment: Duration) -> SecretsResult<LeaseRenewal> {
        self.events.push(format!("renew_start:{}", lease_id));

        let gate = self.renew_gate.lock().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        self.events.push(format!("renew_end:{}", lease_id));
        if self.fail_renew.load(Ordering::SeqCst) {
            return Err(SecretsError::backend_error("lease not found or not renewable"));
        }
        Ok(LeaseRenewal { lease_id: lease_id.to_string(), lease_duration_seconds: increment.as_secs() })
    }

    async fn revoke_lease(&self, lease_id: &str) -> SecretsResult<()> {
        self.events.push(format!("revoke:{}", lease_id));
        Ok(())
    }
}

/// Connection produced by [`RecordingBuilder`]; carries the username it was
/// built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestConnection {
    pub username: String,
}

/// [`ConnectionBuilder`] that records connects and closes.
pub struct RecordingBuilder {
    pub events: EventLog,
    kind: BackendKind,
    pub fail_connect: Arc<AtomicBool>,
}

impl RecordingBuilder {
    pub fn new(events: EventLog) -> Self {
        Self::with_kind(events, BackendKind::Relational)
    }

    pub fn with_kind(events: EventLog, kind: BackendKind) -> Self {
        Self { events, kind, fail_connect: Arc::new(AtomicBool::new(false)) }
    }
}

#[async_trait]
impl ConnectionBuilder for RecordingBuilder {
    type Connection = TestConnection;

    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn connect(&self, credentials: &ResolvedCredentials) -> Result<TestConnection> {
        if self.fail_connect.load(Ordering::SeqCst) {
            self.events.push(format!("connect:{}:failed", credentials.username));
            return Err(Error::connectivity("connection refused"));
        }
        self.events.push(format!("connect:{}", credentials.username));
        Ok(TestConnection { username: credentials.username.clone() })
    }

    async fn close(&self, connection: &TestConnection) -> Result<()> {
        self.events.push(format!("close:{}", connection.username));
        Ok(())
    }
}

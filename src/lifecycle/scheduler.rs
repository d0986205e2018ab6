//! # Renewal Scheduler
//!
//! Background task that ticks at a fixed interval and hands each tick to a
//! [`RenewalTask`]. Stopping is cooperative: a tick that is already running
//! always completes before the task exits.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Work performed on every scheduler tick.
#[async_trait]
pub trait RenewalTask: Send + Sync + 'static {
    async fn on_tick(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Never started; renewal does not apply to this backend.
    Idle,
    Running,
    Stopped,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopped,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Stopped => 2,
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

pub struct RenewalScheduler {
    backend: String,
    interval: Option<Duration>,
    state: Arc<AtomicU8>,
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RenewalScheduler {
    /// A scheduler that never runs.
    pub fn idle(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            interval: None,
            state: Arc::new(AtomicU8::new(SchedulerState::Idle.as_u8())),
            shutdown: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the background loop. The first tick fires one full `interval`
    /// after this call; ticks missed while a previous tick was still running
    /// are skipped.
    pub fn start<T: RenewalTask>(backend: impl Into<String>, interval: Duration, task: Arc<T>) -> Self {
        let backend = backend.into();
        let state = Arc::new(AtomicU8::new(SchedulerState::Running.as_u8()));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(run_loop(
            backend.clone(),
            interval,
            task,
            shutdown.clone(),
        ));

        tracing::info!(
            backend = %backend,
            interval_seconds = interval.as_secs(),
            "lease renewal scheduler started"
        );

        Self { backend, interval: Some(interval), state, shutdown, handle: Mutex::new(Some(handle)) }
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Signal the loop to stop and wait for it to exit.
    ///
    /// Every caller returns only after the loop has exited, including callers
    /// that overlap with an in-flight tick. Returns `true` only for the call
    /// that actually stopped a running loop; an idle scheduler stays idle.
    pub async fn stop(&self) -> bool {
        self.shutdown.cancel();

        // Held across the join so concurrent callers queue behind it.
        let mut slot = self.handle.lock().await;
        let Some(handle) = slot.take() else {
            return false;
        };

        if let Err(e) = handle.await {
            tracing::error!(backend = %self.backend, error = %e, "lease renewal task terminated abnormally");
        }
        self.state.store(SchedulerState::Stopped.as_u8(), Ordering::Release);
        tracing::info!(backend = %self.backend, "lease renewal scheduler stopped");
        true
    }
}

impl Drop for RenewalScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl fmt::Debug for RenewalScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenewalScheduler")
            .field("backend", &self.backend)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish()
    }
}

async fn run_loop<T: RenewalTask>(
    backend: String,
    period: Duration,
    task: Arc<T>,
    shutdown: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::debug!(backend = %backend, "lease renewal loop shutting down");
                break;
            }
            _ = ticker.tick() => {}
        }

        task.on_tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct CountingTask {
        ticks: AtomicUsize,
    }

    #[async_trait]
    impl RenewalTask for CountingTask {
        async fn on_tick(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_full_interval() {
        let task = Arc::new(CountingTask::default());
        let scheduler = RenewalScheduler::start("db", Duration::from_secs(2880), task.clone());
        assert_eq!(scheduler.state(), SchedulerState::Running);

        tokio::time::sleep(Duration::from_secs(2879)).await;
        assert_eq!(task.ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(task.ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(2880)).await;
        assert_eq!(task.ticks.load(Ordering::SeqCst), 2);

        assert!(scheduler.stop().await);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_idle_scheduler_stays_idle() {
        let scheduler = RenewalScheduler::idle("cache");
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.interval(), None);
        assert!(!scheduler.stop().await);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let task = Arc::new(CountingTask::default());
        let scheduler = RenewalScheduler::start("db", Duration::from_secs(10), task.clone());

        assert!(scheduler.stop().await);
        assert!(!scheduler.stop().await);
        assert!(!scheduler.stop().await);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(task.ticks.load(Ordering::SeqCst), 0);
    }

    struct GatedTask {
        started: Notify,
        release: Notify,
        finished: AtomicUsize,
    }

    #[async_trait]
    impl RenewalTask for GatedTask {
        async fn on_tick(&self) {
            self.started.notify_one();
            self.release.notified().await;
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_in_flight_tick() {
        let task = Arc::new(GatedTask {
            started: Notify::new(),
            release: Notify::new(),
            finished: AtomicUsize::new(0),
        });
        let scheduler = Arc::new(RenewalScheduler::start("db", Duration::from_secs(5), task.clone()));

        task.started.notified().await;

        let stopper = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.stop().await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!stopper.is_finished());
        assert_eq!(scheduler.state(), SchedulerState::Running);

        task.release.notify_one();
        assert!(stopper.await.unwrap());
        assert_eq!(task.finished.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stop_waits_for_loop_exit() {
        let task = Arc::new(GatedTask {
            started: Notify::new(),
            release: Notify::new(),
            finished: AtomicUsize::new(0),
        });
        let scheduler = Arc::new(RenewalScheduler::start("db", Duration::from_secs(5), task.clone()));

        task.started.notified().await;

        let first = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.stop().await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let second = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                let stopped = scheduler.stop().await;
                (stopped, scheduler.state())
            })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!first.is_finished());
        assert!(!second.is_finished());

        task.release.notify_one();
        assert!(first.await.unwrap());
        let (stopped, state) = second.await.unwrap();
        assert!(!stopped);
        assert_eq!(state, SchedulerState::Stopped);
        assert_eq!(task.finished.load(Ordering::SeqCst), 1);
    }
}

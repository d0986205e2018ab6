//! # Connection Swapper
//!
//! Holds the current connection handle of a manager. Readers get a
//! reference-counted [`ConnectionHandle`]; a regeneration installs a new
//! handle atomically and retires the old one, which is closed once no reader
//! holds it anymore or the drain timeout elapses.

use arc_swap::ArcSwap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::connection::ConnectionBuilder;
use crate::errors::Result;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Versioned<C> {
    generation: u64,
    connection: C,
}

/// A shared, read-only reference to one installed connection.
///
/// Holding a handle keeps the connection open across a swap until the drain
/// timeout elapses.
pub struct ConnectionHandle<C> {
    inner: Arc<Versioned<C>>,
}

impl<C> ConnectionHandle<C> {
    /// 1 for the connection built at init, incremented on every swap.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }
}

impl<C> Clone for ConnectionHandle<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C> Deref for ConnectionHandle<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner.connection
    }
}

impl<C: fmt::Debug> fmt::Debug for ConnectionHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("generation", &self.inner.generation)
            .field("connection", &self.inner.connection)
            .finish()
    }
}

/// A connection that was replaced and is waiting to be closed.
#[must_use = "a retired connection must be passed to ConnectionSwapper::retire"]
pub struct RetiredConnection<C> {
    inner: Arc<Versioned<C>>,
}

impl<C> RetiredConnection<C> {
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Handles to this connection still held outside the swapper.
    pub fn readers(&self) -> usize {
        Arc::strong_count(&self.inner).saturating_sub(1)
    }
}

/// Owns the current connection of one manager and the builder that closes it.
pub struct ConnectionSwapper<B: ConnectionBuilder> {
    backend: String,
    builder: Arc<B>,
    current: ArcSwap<Versioned<B::Connection>>,
    generation: AtomicU64,
    drain_timeout: Duration,
}

impl<B: ConnectionBuilder> ConnectionSwapper<B> {
    pub fn new(
        backend: impl Into<String>,
        builder: Arc<B>,
        connection: B::Connection,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            backend: backend.into(),
            builder,
            current: ArcSwap::from_pointee(Versioned { generation: 1, connection }),
            generation: AtomicU64::new(1),
            drain_timeout,
        }
    }

    pub fn builder(&self) -> &Arc<B> {
        &self.builder
    }

    pub fn current(&self) -> ConnectionHandle<B::Connection> {
        ConnectionHandle { inner: self.current.load_full() }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Make `connection` the current handle.
    ///
    /// Readers observe either the old or the new handle, never a mix. The
    /// returned connection is still open.
    pub fn install(&self, connection: B::Connection) -> (u64, RetiredConnection<B::Connection>) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let previous = self.current.swap(Arc::new(Versioned { generation, connection }));

        tracing::info!(
            backend = %self.backend,
            generation,
            retired_generation = previous.generation,
            "installed new connection"
        );
        (generation, RetiredConnection { inner: previous })
    }

    /// Wait for readers of a retired connection to let go, then close it.
    ///
    /// Waits at most the drain timeout; a zero timeout closes immediately.
    pub async fn retire(&self, retired: RetiredConnection<B::Connection>) -> Result<()> {
        let generation = retired.generation();

        if !self.drain_timeout.is_zero() {
            let deadline = Instant::now() + self.drain_timeout;
            while retired.readers() > 0 {
                if Instant::now() >= deadline {
                    tracing::warn!(
                        backend = %self.backend,
                        generation,
                        readers = retired.readers(),
                        drain_timeout_seconds = self.drain_timeout.as_secs(),
                        "drain timeout elapsed, closing retired connection while still in use"
                    );
                    break;
                }
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        }

        self.builder.close(&retired.inner.connection).await.map_err(|e| {
            tracing::warn!(backend = %self.backend, generation, error = %e, "Failed to close retired connection");
            e
        })?;
        tracing::debug!(backend = %self.backend, generation, "retired connection closed");
        Ok(())
    }

    /// Close the current connection without draining.
    pub async fn close_current(&self) -> Result<()> {
        let current = self.current.load_full();
        self.builder.close(&current.connection).await
    }
}

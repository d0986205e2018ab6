//! # Observability
//!
//! Structured logging for the credential lifecycle. Every renewal tick runs
//! inside a [`lease_span!`](crate::lease_span) span so that renew, regenerate
//! and swap events of one tick share an `operation_id`.

pub mod logging;

pub use logging::{init_logging, log_manager_started};

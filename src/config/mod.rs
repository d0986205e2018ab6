//! # Configuration Management
//!
//! Explicit configuration values constructed once at startup and passed by
//! reference into each credential manager.

pub mod settings;

pub use settings::{CredentialConfig, LoggingConfig};

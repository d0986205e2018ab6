//! # Error Handling
//!
//! Error taxonomy for credential loading, connection building and the
//! lifecycle manager. Startup paths return these errors; the background
//! renewal task only logs them.

use crate::secrets::SecretsError;

/// Custom result type for credkeeper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the credential lifecycle manager
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required setting is missing or invalid. Fatal at startup.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// An expected field is absent from a secret-store response.
    #[error("Lookup error: {message}")]
    Lookup { message: String },

    /// The secret store or the backend could not be reached or refused the request.
    #[error("Connectivity error: {message}")]
    Connectivity {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a new lookup error
    pub fn lookup<S: Into<String>>(message: S) -> Self {
        Self::Lookup { message: message.into() }
    }

    /// Create a new connectivity error
    pub fn connectivity<S: Into<String>>(message: S) -> Self {
        Self::Connectivity { message: message.into(), source: None }
    }

    /// Create a connectivity error with source
    pub fn connectivity_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Connectivity { message: message.into(), source: Some(source) }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup { .. })
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}

impl From<SecretsError> for Error {
    fn from(err: SecretsError) -> Self {
        match err {
            SecretsError::NotFound { .. } => Self::lookup(err.to_string()),
            SecretsError::ConfigError { .. } => Self::config(err.to_string()),
            other => {
                let message = other.to_string();
                Self::connectivity_with_source(message, Box::new(other))
            }
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::config(err.to_string())
    }
}

//! Error types for secret store operations.

use thiserror::Error;

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while talking to a secret store.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// Secret, role or lease not found in the backend.
    #[error("Secret not found: {key}")]
    NotFound { key: String },

    /// Failed to connect to the secret store.
    #[error("Backend connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Authentication with the secret store failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Backend-specific error (unexpected status, missing lease).
    #[error("Backend error: {message}")]
    BackendError { message: String },

    /// Store client configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// A response body that is not the expected JSON envelope.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create an authentication failed error.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: message.into() }
    }

    /// Create a backend error.
    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::BackendError { message: message.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = SecretsError::not_found("secret/data/app");
        assert!(matches!(err, SecretsError::NotFound { .. }));
        assert_eq!(err.to_string(), "Secret not found: secret/data/app");

        let err = SecretsError::connection_failed("timeout");
        assert!(matches!(err, SecretsError::ConnectionFailed { .. }));

        let err = SecretsError::authentication_failed("permission denied");
        assert!(err.to_string().contains("Authentication failed"));
    }
}

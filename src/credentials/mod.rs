//! Credential modes, lease state and the credential loader.

pub mod lease;
pub mod loader;
pub mod mode;

pub use lease::LeaseState;
pub use loader::{CredentialLoader, ResolvedCredentials, ValidationWarning};
pub use mode::CredentialMode;

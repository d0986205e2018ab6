//! # Credential Lifecycle
//!
//! [`CredentialManager`] ties the pieces together: a [`RenewalScheduler`]
//! drives lease renewal, a [`ConnectionSwapper`] replaces the live connection
//! when credentials are regenerated, and a [`ShutdownCoordinator`] tears
//! everything down in order.

pub mod keeper;
pub mod manager;
pub mod scheduler;
pub mod shutdown;
pub mod swapper;

pub use keeper::LeaseKeeper;
pub use manager::{CredentialManager, ManagerStatus};
pub use scheduler::{RenewalScheduler, RenewalTask, SchedulerState};
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
pub use swapper::{ConnectionHandle, ConnectionSwapper, RetiredConnection};

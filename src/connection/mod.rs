//! Backend connection factories.
//!
//! A [`ConnectionBuilder`] turns resolved credentials into a live handle.
//! Builders for other backend kinds (cache, broker, document store)
//! implement the same trait outside this crate.

pub mod builder;
pub mod postgres;

pub use builder::{BackendKind, ConnectionBuilder};
pub use postgres::{PostgresConnectionBuilder, PostgresParams};

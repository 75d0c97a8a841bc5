#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave Persistence
//!
//! Durable history for the engine : execution rows, per-node
//! execution rows, trigger registrations, and encrypted credential rows,
//! behind the [`store::PersistenceStore`] trait. [`store::InMemoryPersistenceStore`]
//! is always available; enable the `postgres` feature for the
//! [`postgres::PgPersistenceStore`] backend.

/// `PersistenceError` and its mapping into `weave_error::EngineError`.
pub mod error;
/// Row shapes for the four persisted tables.
pub mod row;
/// `PersistenceStore` trait and the in-memory backend.
pub mod store;

#[cfg(feature = "postgres")]
/// `sqlx`-backed `PersistenceStore` implementation.
pub mod postgres;

pub use error::PersistenceError;
pub use row::{CredentialRow, ExecutionRow, NodeExecutionRow, TriggerRow};
pub use store::{InMemoryPersistenceStore, PersistedCredentialStore, PersistenceStore};

#[cfg(feature = "postgres")]
pub use postgres::PgPersistenceStore;

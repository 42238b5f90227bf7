//! # Chaos Harvester Storage
//!
//! Persistence layer for chaos events.
//!
//! This crate provides:
//! - The [`EventStore`] trait used by the API and the background processor
//! - A SQLite-backed implementation ([`SqliteEventStore`])

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod sqlite;

use async_trait::async_trait;
use chaos_harvester_core::{events::ChaosEvent, Result};

pub use sqlite::SqliteEventStore;

/// Trait for event store backends.
///
/// The store is append-only from the application's side: there is no
/// update or delete.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a single event. A duplicate id is an error.
    async fn insert(&self, event: &ChaosEvent) -> Result<()>;

    /// All events, ordered by id descending
    async fn list(&self) -> Result<Vec<ChaosEvent>>;

    /// Fetch one event by id
    async fn get(&self, id: &str) -> Result<Option<ChaosEvent>>;

    /// Number of stored events
    async fn count(&self) -> Result<u64>;

    /// Health check
    async fn health_check(&self) -> Result<()>;
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::sqlite::SqliteEventStore;
    pub use crate::EventStore;
}

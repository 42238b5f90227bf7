//! # Chaos Harvester Core
//!
//! Shared building blocks for the chaos harvester:
//! - Domain types (chaos payloads, stored events, sources, threat levels)
//! - Service configuration
//! - The common error type

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod config;
pub mod events;

use thiserror::Error;

/// Result alias used across the harvester crates
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the harvester crates
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Event store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::events::{ChaosEvent, ChaosPayload, ChaosSource, Signals, ThreatLevel};
    pub use crate::{Error, Result};
}

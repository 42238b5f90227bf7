//! API request handlers.
//!
//! - Ingestion (`POST /ingest`)
//! - Dashboard (`GET /`)
//! - Health (`GET /health`)

pub mod dashboard;
pub mod health;
pub mod ingest;

pub use dashboard::*;
pub use health::*;
pub use ingest::*;

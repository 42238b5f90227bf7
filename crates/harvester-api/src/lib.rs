//! # Chaos Harvester API
//!
//! HTTP surface of the chaos harvester:
//! - `POST /ingest` accepts a chaos payload and schedules background processing
//! - `GET /` renders the dashboard of stored events
//! - `GET /health` reports store reachability
//!
//! The [`processor`] module owns the background jobs that extract signals
//! and persist events after the ingestion response has been sent.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod dashboard;
pub mod handlers;
pub mod middleware;
pub mod processor;
pub mod routes;

use std::future::Future;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use chaos_harvester_core::config::Config;
use chaos_harvester_extraction::SignalExtractor;
use chaos_harvester_storage::EventStore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::handlers::{DashboardState, HealthState, IngestState};
use crate::processor::Processor;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address
    pub bind_addr: SocketAddr,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Log every request
    pub enable_logging: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            timeout_secs: 30,
            max_body_size: 1024 * 1024,
            enable_logging: true,
        }
    }
}

impl ApiConfig {
    /// Derive API settings from the service configuration
    pub fn from_config(config: &Config) -> chaos_harvester_core::Result<Self> {
        let bind_addr = resolve_bind_addr(&config.server.host, config.server.port)?;

        Ok(Self {
            bind_addr,
            timeout_secs: config.server.request_timeout_secs,
            max_body_size: config.server.max_body_bytes,
            enable_logging: true,
        })
    }
}

/// Turn a configured host into a socket address.
///
/// IP literals are used as-is, with or without IPv6 brackets. Anything else
/// is resolved once and the first address wins.
fn resolve_bind_addr(host: &str, port: u16) -> chaos_harvester_core::Result<SocketAddr> {
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            chaos_harvester_core::Error::config(format!(
                "Invalid server bind address {}: {}",
                host, e
            ))
        })?
        .next()
        .ok_or_else(|| {
            chaos_harvester_core::Error::config(format!("Server host {} did not resolve", host))
        })
}

/// JSON error body for non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short error code
    pub error: String,
    /// Human-readable detail
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// States for every route group
#[derive(Debug, Clone)]
pub struct AppStates {
    pub ingest: Arc<IngestState>,
    pub dashboard: Arc<DashboardState>,
    pub health: Arc<HealthState>,
}

impl AppStates {
    /// Wire the states from their shared dependencies
    pub fn new(
        store: Arc<dyn EventStore>,
        extractor: Arc<SignalExtractor>,
        escape_html: bool,
        version: impl Into<String>,
    ) -> Self {
        let processor = Processor::new(extractor, store.clone());
        Self {
            ingest: Arc::new(IngestState::new(processor)),
            dashboard: Arc::new(DashboardState::new(store.clone(), escape_html)),
            health: Arc::new(HealthState::new(store, version)),
        }
    }

    /// The processor behind the ingestion endpoint
    pub fn processor(&self) -> &Processor {
        &self.ingest.processor
    }
}

/// HTTP server wrapper
#[derive(Debug)]
pub struct ApiServer {
    config: ApiConfig,
    states: AppStates,
}

impl ApiServer {
    pub fn new(config: ApiConfig, states: AppStates) -> Self {
        Self { config, states }
    }

    /// Serve until `shutdown` resolves. Background jobs still running at
    /// that point are not awaited.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = routes::create_router(&self.config, self.states);
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        info!(addr = %self.config.bind_addr, "API server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::processor::{ProcessingOutcome, ProcessingReport, Processor};
    pub use crate::routes::create_router;
    pub use crate::{ApiConfig, ApiServer, AppStates, ErrorResponse};
}

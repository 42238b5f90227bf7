//! Health check handler.

use std::fmt;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chaos_harvester_storage::EventStore;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Shared state for the health handler
#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<dyn EventStore>,
    pub version: String,
}

impl fmt::Debug for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthState")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl HealthState {
    pub fn new(store: Arc<dyn EventStore>, version: impl Into<String>) -> Self {
        Self {
            store,
            version: version.into(),
        }
    }
}

/// Health response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `unhealthy`
    pub status: String,
    pub version: String,
    /// Stored event count, when the store answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<u64>,
}

/// GET /health
pub async fn health(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let check = match state.store.health_check().await {
        Ok(()) => state.store.count().await,
        Err(e) => Err(e),
    };

    match check {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                version: state.version.clone(),
                events: Some(count),
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Event store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    version: state.version.clone(),
                    events: None,
                }),
            )
        }
    }
}

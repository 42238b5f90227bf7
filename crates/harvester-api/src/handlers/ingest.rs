//! Chaos ingestion handler.
//!
//! - POST /ingest - Validate the source tag and schedule background processing
//!
//! An unknown source is answered with an error object and a 200 status.
//! An accepted payload is answered before any row exists.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use chaos_harvester_core::events::{ChaosPayload, ChaosSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::processor::Processor;

/// Error text returned for sources outside the allow-list
pub const UNKNOWN_SOURCE_MESSAGE: &str = "Source not recognized in this dimension.";

/// Status text returned for accepted payloads
pub const ACCEPTED_STATUS: &str = "Tethered to entropy";

// =============================================================================
// STATE
// =============================================================================

/// Shared state for the ingestion handler
#[derive(Debug, Clone)]
pub struct IngestState {
    /// Background processor for accepted payloads
    pub processor: Processor,
}

impl IngestState {
    pub fn new(processor: Processor) -> Self {
        Self { processor }
    }
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

/// Ingestion response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IngestResponse {
    /// Payload accepted and scheduled
    Accepted { status: String, event_id: String },
    /// Source tag not in the allow-list
    Rejected { error: String },
}

impl IngestResponse {
    fn accepted(event_id: String) -> Self {
        Self::Accepted {
            status: ACCEPTED_STATUS.to_string(),
            event_id,
        }
    }

    fn rejected() -> Self {
        Self::Rejected {
            error: UNKNOWN_SOURCE_MESSAGE.to_string(),
        }
    }
}

// =============================================================================
// HANDLER
// =============================================================================

/// POST /ingest
#[instrument(skip(state, payload), fields(source = %payload.source))]
pub async fn ingest_chaos(
    State(state): State<Arc<IngestState>>,
    Json(payload): Json<ChaosPayload>,
) -> impl IntoResponse {
    let Some(source) = ChaosSource::parse(&payload.source) else {
        info!("Rejected chaos from unrecognized source");
        ::metrics::counter!("harvester_ingest_rejected_total").increment(1);
        return Json(IngestResponse::rejected());
    };

    let event_id = Uuid::new_v4().to_string();
    debug!("[{}] CHAOS RECEIVED from {}", event_id, source);
    ::metrics::counter!("harvester_ingest_accepted_total").increment(1);

    // Detached: the response does not wait for extraction or persistence.
    drop(state.processor.schedule(payload, source, event_id.clone()));

    Json(IngestResponse::accepted(event_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_response_shape() {
        let json = serde_json::to_value(IngestResponse::accepted("abc".to_string())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "Tethered to entropy", "event_id": "abc"})
        );
    }

    #[test]
    fn test_rejected_response_shape() {
        let json = serde_json::to_value(IngestResponse::rejected()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "Source not recognized in this dimension."})
        );
    }
}

//! Dashboard handler.
//!
//! - GET / - Render every stored event as an HTML table
//!
//! Rows are ordered by id descending. Ids are random UUIDs, so this is not
//! chronological order.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chaos_harvester_storage::EventStore;
use tracing::{debug, error, instrument};

use crate::dashboard::render_dashboard;
use crate::ErrorResponse;

/// Shared state for the dashboard handler
#[derive(Clone)]
pub struct DashboardState {
    pub store: Arc<dyn EventStore>,
    /// Escape stored text before embedding it
    pub escape_html: bool,
}

impl fmt::Debug for DashboardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardState")
            .field("escape_html", &self.escape_html)
            .finish_non_exhaustive()
    }
}

impl DashboardState {
    pub fn new(store: Arc<dyn EventStore>, escape_html: bool) -> Self {
        Self { store, escape_html }
    }
}

/// GET /
#[instrument(skip(state))]
pub async fn dashboard_page(State(state): State<Arc<DashboardState>>) -> Response {
    match state.store.list().await {
        Ok(events) => {
            debug!(events = events.len(), "Rendering dashboard");
            Html(render_dashboard(&events, state.escape_html)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to read chaos events");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("STORAGE_UNAVAILABLE", e.to_string())),
            )
                .into_response()
        }
    }
}

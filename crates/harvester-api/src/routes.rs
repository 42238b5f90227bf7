//! API route definitions.
//!
//! - `POST /ingest` - Chaos ingestion
//! - `GET /` - Dashboard
//! - `GET /health` - Health check

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::{
    handlers::{dashboard_page, health, ingest_chaos},
    middleware::logging_middleware,
    ApiConfig, AppStates,
};

/// Create the API router
pub fn create_router(config: &ApiConfig, states: AppStates) -> Router {
    let ingest_routes = Router::new()
        .route("/ingest", post(ingest_chaos))
        .with_state(states.ingest);

    let dashboard_routes = Router::new()
        .route("/", get(dashboard_page))
        .with_state(states.dashboard);

    let health_routes = Router::new()
        .route("/health", get(health))
        .with_state(states.health);

    let app = Router::new()
        .merge(ingest_routes)
        .merge(dashboard_routes)
        .merge(health_routes);

    let app = if config.enable_logging {
        app.layer(middleware::from_fn(logging_middleware))
    } else {
        app
    };

    app.layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeout_secs)))
}

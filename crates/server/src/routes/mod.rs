// crates/server/src/routes/mod.rs
//! API route handlers for the genview server.

pub mod health;
pub mod jobs;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health               - Health check
/// - POST /api/jobs/{id}/run        - Launch the generator for a job
/// - GET  /api/jobs/{id}/status     - Job lifecycle flags
/// - GET  /api/jobs/{id}/events     - SSE stream of artifact deliveries
/// - GET  /api/jobs/{id}/artifacts  - Persisted artifact records
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", jobs::router())
        .with_state(state)
}

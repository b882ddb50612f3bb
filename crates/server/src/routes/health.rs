// crates/server/src/routes/health.rs
//! Liveness and readiness endpoint.
//!
//! Reports `degraded` rather than failing the request when the database
//! stops answering, so an operator still gets the uptime and running-job
//! picture from a half-broken server.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Whether the artifact store currently answers queries.
    pub db_ok: bool,
    /// Generation jobs running right now (each with a live watcher).
    pub jobs_running: usize,
}

/// GET /api/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let db_ok = state.db.ping().await.is_ok();
    Json(HealthResponse {
        status: if db_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        db_ok,
        jobs_running: state.runner.running_count(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GeneratorConfig;
    use crate::watch::{EventRegistry, JobRunner, WatcherConfig};
    use genview_core::PathGuard;
    use std::time::Duration;

    async fn test_state() -> Arc<AppState> {
        let db = genview_db::Database::new_in_memory().await.expect("in-memory DB");
        let events = EventRegistry::new();
        let runner = Arc::new(JobRunner::new(
            db.clone(),
            events.clone(),
            PathGuard::new("/tmp"),
            WatcherConfig::default(),
            Duration::from_secs(60),
        ));
        AppState::new(
            db,
            "/tmp".into(),
            events,
            runner,
            GeneratorConfig {
                program: "true".into(),
                args: vec![],
            },
        )
    }

    #[tokio::test]
    async fn healthy_server_reports_ok_and_zero_jobs() {
        let state = test_state().await;
        let Json(body) = health_check(State(state)).await;

        assert_eq!(body.status, "ok");
        assert!(body.db_ok);
        assert_eq!(body.jobs_running, 0);
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn closed_database_degrades_status() {
        let state = test_state().await;
        state.db.pool().close().await;

        let Json(body) = health_check(State(state)).await;
        assert_eq!(body.status, "degraded");
        assert!(!body.db_ok);
    }

    #[test]
    fn health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            version: "0.4.0".to_string(),
            uptime_secs: 42,
            db_ok: true,
            jobs_running: 3,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"db_ok\":true"));
        assert!(json.contains("\"jobs_running\":3"));
    }
}

// crates/server/src/routes/jobs.rs
//! Job endpoints: launch, status, artifact listing and the SSE delivery
//! stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;

use genview_core::PathGuard;

use crate::error::{ApiError, ApiResult};
use crate::launcher::run_generator;
use crate::state::AppState;

/// Build the jobs sub-router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs/{id}/run", post(run_job))
        .route("/jobs/{id}/status", get(job_status))
        .route("/jobs/{id}/events", get(job_events))
        .route("/jobs/{id}/artifacts", get(list_artifacts))
}

/// POST /api/jobs/:id/run -- launch the configured generator for a job.
///
/// Returns 202 immediately; progress is observable via the event stream.
/// The job id is validated against the safe charset before any directory
/// is created for it.
async fn run_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    if !PathGuard::valid_job_id(&id) {
        return Err(ApiError::BadRequest(
            "job id must match [A-Za-z0-9_-]+".to_string(),
        ));
    }
    if state.runner.is_running(&id) {
        return Err(ApiError::Conflict(format!("job {id} is already running")));
    }

    let job_dir = state.root_dir.join(&id);
    tokio::fs::create_dir_all(&job_dir)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let runner = Arc::clone(&state.runner);
    let generator = state.generator.clone();
    let job_id = id.clone();
    tokio::spawn(async move {
        let launch = {
            let job_id = job_id.clone();
            async move {
                run_generator(&generator.program, &generator.args, &job_id, &job_dir).await
            }
        };
        if let Err(e) = runner.run_job(&job_id, launch).await {
            tracing::warn!(job_id = %job_id, error = %e, "generation job ended with error");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job_id": id, "status": "started" })),
    ))
}

/// GET /api/jobs/:id/status -- lifecycle flags for one job.
async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    match state.runner.snapshot(&id) {
        Some(snap) => Ok(Json(json!({ "job": snap }))),
        None => Err(ApiError::JobNotFound(id)),
    }
}

/// GET /api/jobs/:id/artifacts -- persisted artifact records for one job.
async fn list_artifacts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let artifacts = state.db.artifacts_for_job(&id).await?;
    Ok(Json(json!({
        "total": artifacts.len(),
        "artifacts": artifacts,
    })))
}

/// GET /api/jobs/:id/events -- SSE stream of artifact deliveries.
///
/// # Events
///
/// | Event name | When emitted                                      |
/// |------------|---------------------------------------------------|
/// | `snapshot` | On connect, and when a client lags                |
/// | `artifact` | One per artifact version accepted by the watcher  |
/// | `heartbeat`| Periodically, to keep the connection open         |
///
/// On connect the server sends the already-persisted records so a client
/// that attaches mid-job hydrates without a separate REST call.
async fn job_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.events.subscribe(&id);
    let db = state.db.clone();

    let stream = async_stream::stream! {
        match db.artifacts_for_job(&id).await {
            Ok(records) => {
                yield Ok(Event::default().event("snapshot").data(
                    serde_json::to_string(&records).unwrap_or_default()
                ));
            }
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "snapshot query failed on SSE connect");
            }
        }

        let mut heartbeat = tokio::time::interval(Duration::from_secs(15));
        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Ok(delivery) => {
                            yield Ok(Event::default().event("artifact").data(
                                serde_json::to_string(&delivery).unwrap_or_default()
                            ));
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(job_id = %id, lagged = n, "SSE client lagged; re-sending snapshot");
                            // The durable records cover whatever was missed.
                            if let Ok(records) = db.artifacts_for_job(&id).await {
                                yield Ok(Event::default().event("snapshot").data(
                                    serde_json::to_string(&records).unwrap_or_default()
                                ));
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    yield Ok(Event::default().event("heartbeat").data("{}"));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

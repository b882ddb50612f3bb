// crates/server/src/watch/runner.rs
//! Lifecycle owner for generation jobs.
//!
//! `run_job` starts the per-job watcher alongside the external generator
//! and guarantees, on every exit path including timeout and panic, that the
//! watcher is cancelled and fully joined before control returns to the
//! caller. A background task must never outlive the scope that spawned it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::error;

use genview_core::PathGuard;
use genview_db::Database;

use super::events::EventRegistry;
use super::watcher::{ArtifactWatcher, WatcherConfig};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} is already running")]
    AlreadyRunning(String),

    #[error("failed to launch generator: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("generation job failed: {0}")]
    Failed(String),

    #[error("job timed out after {0:?}")]
    TimedOut(Duration),

    #[error("generation job panicked")]
    Panicked,
}

/// Per-job lifecycle flags, shared with route handlers for status checks
/// and with tests for the shutdown guarantee.
struct JobState {
    running: AtomicBool,
    watcher_done: AtomicBool,
}

/// Point-in-time view of one job's lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub running: bool,
    /// True once the job's watcher task has fully terminated.
    pub watcher_done: bool,
}

/// Runs generation jobs with an attached artifact watcher.
///
/// Thread-safe via `Arc` wrapping; one instance serves all jobs.
pub struct JobRunner {
    db: Database,
    events: EventRegistry,
    guard: PathGuard,
    watcher_config: WatcherConfig,
    job_timeout: Duration,
    jobs: RwLock<HashMap<String, Arc<JobState>>>,
}

impl JobRunner {
    pub fn new(
        db: Database,
        events: EventRegistry,
        guard: PathGuard,
        watcher_config: WatcherConfig,
        job_timeout: Duration,
    ) -> Self {
        Self {
            db,
            events,
            guard,
            watcher_config,
            job_timeout,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.snapshot(job_id).map(|s| s.running).unwrap_or(false)
    }

    /// Number of jobs currently running.
    pub fn running_count(&self) -> usize {
        match self.jobs.read() {
            Ok(jobs) => jobs
                .values()
                .filter(|s| s.running.load(Ordering::SeqCst))
                .count(),
            Err(e) => {
                error!("RwLock poisoned reading jobs map: {e}");
                0
            }
        }
    }

    /// Current lifecycle flags for a job, `None` if it never ran.
    pub fn snapshot(&self, job_id: &str) -> Option<JobSnapshot> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(job_id).map(|s| JobSnapshot {
                job_id: job_id.to_string(),
                running: s.running.load(Ordering::SeqCst),
                watcher_done: s.watcher_done.load(Ordering::SeqCst),
            }),
            Err(e) => {
                error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        }
    }

    /// Mark a job as running, rejecting a second concurrent run.
    fn register(&self, job_id: &str) -> Result<Arc<JobState>, JobError> {
        let mut jobs = self
            .jobs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = jobs.get(job_id) {
            if existing.running.load(Ordering::SeqCst) {
                return Err(JobError::AlreadyRunning(job_id.to_string()));
            }
        }

        let state = Arc::new(JobState {
            running: AtomicBool::new(true),
            watcher_done: AtomicBool::new(false),
        });
        jobs.insert(job_id.to_string(), Arc::clone(&state));
        Ok(state)
    }

    /// Run one generation job to completion under the overall timeout.
    ///
    /// `launch` resolves when the external generator process exits. It runs
    /// as its own task so a panic inside it surfaces as a join error here
    /// instead of unwinding past the cleanup below. The returned error is
    /// always the job's; the watcher only best-effort delivers events and
    /// can never fail the job.
    pub async fn run_job<F>(&self, job_id: &str, launch: F) -> Result<(), JobError>
    where
        F: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let state = self.register(job_id)?;

        let cancel = CancellationToken::new();
        let watcher = ArtifactWatcher::new(
            job_id,
            self.guard.clone(),
            self.db.clone(),
            self.events.sender_for(job_id),
            self.watcher_config.clone(),
        );
        let watcher_handle = tokio::spawn(watcher.run(cancel.child_token()));
        // If this future is dropped before the cleanup below runs, the
        // guard still cancels the token and the watcher task exits.
        let _watcher_guard = cancel.clone().drop_guard();
        let mut job_handle = tokio::spawn(launch);

        let result = match tokio::time::timeout(self.job_timeout, &mut job_handle).await {
            Ok(Ok(job_result)) => job_result,
            Ok(Err(join_err)) => {
                error!(job_id, error = %join_err, "generation job task panicked");
                Err(JobError::Panicked)
            }
            Err(_) => {
                // Deadline is the sole authority on run length. Abort the
                // job task; kill_on_drop reaps the child process.
                job_handle.abort();
                let _ = job_handle.await;
                Err(JobError::TimedOut(self.job_timeout))
            }
        };

        // Cleanup on every path above: cancel the watcher and block until
        // its task has actually returned. Cancelling twice is a no-op.
        cancel.cancel();
        match watcher_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(job_id, error = %e, "watcher failed at startup"),
            Err(e) => error!(job_id, error = %e, "watcher task panicked"),
        }
        state.watcher_done.store(true, Ordering::SeqCst);
        state.running.store(false, Ordering::SeqCst);

        result
    }
}

// crates/server/src/watch/watcher.rs
//! Polling watcher that discovers finished artifacts in one job's output
//! directory and delivers them.
//!
//! ## Loop shape
//!
//! Every poll interval the watcher scans the job directory, feeds each
//! `(filename, size)` observation through the stabilization tracker, and for
//! every version that has stopped growing: validates the path, persists the
//! record, then emits a [`DeliveryEvent`]. The unit of identity is the
//! `(filename, size)` pair: a file deleted and rewritten to a different
//! size is a new version and is delivered again.
//!
//! Per-file failures never abort the loop. A name that fails path
//! validation is dropped for the rest of the run; a failed upsert is
//! retried on the next scan because the version is not marked sent.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use genview_core::{identify, scan_dir, ArtifactObservation, PathGuard, SecurityViolation, StabilizationTracker};
use genview_db::Database;

use super::events::DeliveryEvent;

/// Unrecoverable watcher startup failure. Everything after startup is
/// handled inside the loop.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("job directory {path} is not accessible: {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Tunables shared by every watcher the server spawns.
///
/// The poll interval doubles as the stabilization window: a file is
/// delivered once its size has held for one full interval. Shorter means
/// lower delivery latency but a higher chance of catching a writer
/// mid-pause.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    /// Variant reported when a filename carries no variant suffix.
    pub default_variant: String,
    /// Stage tag stored on every artifact record.
    pub stage: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            default_variant: "en".to_string(),
            stage: "generate".to_string(),
        }
    }
}

/// Per-job artifact watcher. All tracking state (sent set, stabilization
/// map, blocked names) is owned by this instance and touched only from its
/// own loop; subscribers see the output channel, never this state.
pub struct ArtifactWatcher {
    job_id: String,
    job_dir: PathBuf,
    guard: PathGuard,
    db: Database,
    events: broadcast::Sender<DeliveryEvent>,
    config: WatcherConfig,
    /// Versions already delivered, never reprocessed for the job's lifetime.
    sent: HashSet<(String, u64)>,
    /// Names that failed path validation; permanently dropped.
    blocked: HashSet<String>,
    tracker: StabilizationTracker,
}

impl ArtifactWatcher {
    pub fn new(
        job_id: impl Into<String>,
        guard: PathGuard,
        db: Database,
        events: broadcast::Sender<DeliveryEvent>,
        config: WatcherConfig,
    ) -> Self {
        let job_id = job_id.into();
        let job_dir = guard.root().join(&job_id);
        Self {
            job_id,
            job_dir,
            guard,
            db,
            events,
            config,
            sent: HashSet::new(),
            blocked: HashSet::new(),
            tracker: StabilizationTracker::new(),
        }
    }

    /// Poll until cancelled. Returns an error only when the job directory
    /// is missing at start; cancellation is the normal exit and is observed
    /// during the inter-scan sleep, so shutdown latency is bounded by one
    /// poll interval.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), WatchError> {
        match std::fs::metadata(&self.job_dir) {
            Ok(m) if m.is_dir() => {}
            Ok(_) => {
                return Err(WatchError::Setup {
                    path: self.job_dir,
                    source: std::io::Error::other("not a directory"),
                })
            }
            Err(source) => {
                return Err(WatchError::Setup {
                    path: self.job_dir,
                    source,
                })
            }
        }

        info!(
            job_id = %self.job_id,
            dir = %self.job_dir.display(),
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "artifact watcher started"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; consume it so the first
        // scan happens one full interval after start.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(job_id = %self.job_id, "artifact watcher cancelled");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }
            self.scan_pass().await;
        }
    }

    /// One scan of the job directory. Extracted from `run` so tests can
    /// drive passes without real time.
    async fn scan_pass(&mut self) {
        let dir = self.job_dir.clone();
        let observations = match tokio::task::spawn_blocking(move || scan_dir(&dir)).await {
            Ok(Ok(obs)) => obs,
            Ok(Err(e)) => {
                // The directory can be briefly unreadable mid-run.
                debug!(job_id = %self.job_id, error = %e, "scan failed; retrying next interval");
                return;
            }
            Err(e) => {
                error!(job_id = %self.job_id, error = %e, "scan task panicked");
                return;
            }
        };

        for obs in observations {
            if self.blocked.contains(&obs.filename) {
                continue;
            }
            if self.sent.contains(&(obs.filename.clone(), obs.size_bytes)) {
                continue;
            }
            if !self.tracker.observe(&obs.filename, obs.size_bytes) {
                // Still growing; size is now on record for the next pass.
                continue;
            }
            self.deliver(obs).await;
        }
    }

    /// Validate, persist and emit one stabilized artifact version.
    async fn deliver(&mut self, obs: ArtifactObservation) {
        match self.guard.resolve(&self.job_id, &obs.filename) {
            Ok(_) => {}
            Err(SecurityViolation::Unresolvable(e)) => {
                // File vanished between scan and validation, not an attack.
                debug!(job_id = %self.job_id, error = %e, "artifact vanished before validation");
                return;
            }
            Err(violation) => {
                // Audit entry without echoing the raw name at normal verbosity.
                warn!(job_id = %self.job_id, error = %violation, "artifact rejected by path validation; dropped");
                debug!(job_id = %self.job_id, filename = %obs.filename, "rejected artifact filename");
                self.blocked.insert(obs.filename);
                return;
            }
        }

        let identity = identify(&obs.filename, None, &self.config.default_variant);
        let rel_path = format!("{}/{}", self.job_id, obs.filename);

        if let Err(e) = self
            .db
            .upsert_artifact(&self.job_id, &rel_path, obs.size_bytes as i64, &self.config.stage)
            .await
        {
            // Transient: the version stays out of `sent`, so the next scan
            // sees the size unchanged and tries again.
            warn!(
                job_id = %self.job_id,
                filename = %obs.filename,
                error = %e,
                "artifact upsert failed; retrying next scan"
            );
            return;
        }

        self.tracker.forget(&obs.filename);
        self.sent.insert((obs.filename.clone(), obs.size_bytes));

        info!(
            job_id = %self.job_id,
            filename = %obs.filename,
            size_bytes = obs.size_bytes,
            artifact_type = %identity.artifact_type,
            variant = %identity.variant,
            "artifact delivered"
        );

        // No subscribers is not an error; the record is already durable.
        let _ = self.events.send(DeliveryEvent {
            job_id: self.job_id.clone(),
            filename: obs.filename,
            size_bytes: obs.size_bytes,
            artifact_type: identity.artifact_type,
            variant: identity.variant,
            path: rel_path,
        });
    }
}

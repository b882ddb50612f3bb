// crates/server/src/state.rs
//! Application state for the Axum server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use genview_db::Database;

use crate::watch::{EventRegistry, JobRunner};

/// The generator command launched for every job run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub program: String,
    pub args: Vec<String>,
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Database handle for artifact record queries.
    pub db: Database,
    /// Safe root under which all job output directories live.
    pub root_dir: PathBuf,
    /// Per-job delivery event channels.
    pub events: EventRegistry,
    /// Job lifecycle owner.
    pub runner: Arc<JobRunner>,
    /// Command launched for each job run.
    pub generator: GeneratorConfig,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(
        db: Database,
        root_dir: PathBuf,
        events: EventRegistry,
        runner: Arc<JobRunner>,
        generator: GeneratorConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            root_dir,
            events,
            runner,
            generator,
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// crates/server/src/watch/mod.rs
//! Per-job artifact watching and delivery.
//!
//! One [`ArtifactWatcher`] runs alongside each generation job, polling the
//! job's output directory and pushing a [`DeliveryEvent`] to that job's
//! channel for every artifact version that finishes writing. [`JobRunner`]
//! owns the lifecycle: it starts the watcher with the job and guarantees
//! the watcher is cancelled and joined on every exit path.

pub mod events;
pub mod runner;
pub mod watcher;

pub use events::{DeliveryEvent, EventRegistry};
pub use runner::{JobError, JobRunner, JobSnapshot};
pub use watcher::{ArtifactWatcher, WatchError, WatcherConfig};

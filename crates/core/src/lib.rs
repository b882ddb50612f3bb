// crates/core/src/lib.rs
//! Core artifact-pipeline logic for genview.
//!
//! Everything here is a leaf: no database, no web framework, no background
//! tasks. The server crate composes these pieces into the per-job watcher
//! loop.

pub mod error;
pub mod identify;
pub mod path_guard;
pub mod scan;
pub mod stabilize;

pub use error::SecurityViolation;
pub use identify::{identify, ArtifactIdentity};
pub use path_guard::PathGuard;
pub use scan::{scan_dir, ArtifactObservation};
pub use stabilize::StabilizationTracker;

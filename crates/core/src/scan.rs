// crates/core/src/scan.rs
//! Directory listing primitive for the watcher's poll loop.
//!
//! Synchronous `std::fs` on purpose: the watcher wraps each scan in
//! `spawn_blocking`, the same split the rest of the codebase uses for
//! filesystem passes.

use std::io;
use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

/// One file as seen during a single scan pass. Ephemeral, never persisted.
#[derive(Debug, Clone)]
pub struct ArtifactObservation {
    /// Bare filename, no path separators.
    pub filename: String,
    pub size_bytes: u64,
    pub observed_at: SystemTime,
}

/// List the regular files directly inside `dir` with their current sizes.
///
/// Subdirectories are skipped (the generator writes flat job directories);
/// non-UTF-8 names are skipped with a debug log. Results are sorted by
/// filename so each pass processes files in a deterministic order.
pub fn scan_dir(dir: &Path) -> io::Result<Vec<ArtifactObservation>> {
    let mut observations = Vec::new();
    let observed_at = SystemTime::now();

    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "unreadable directory entry skipped");
                continue;
            }
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            // File deleted between readdir and stat, normal under churn.
            Err(_) => continue,
        };
        if !metadata.is_file() {
            continue;
        }

        let filename = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                debug!(dir = %dir.display(), name = ?raw, "non-UTF-8 filename skipped");
                continue;
            }
        };

        observations.push(ArtifactObservation {
            filename,
            size_bytes: metadata.len(),
            observed_at,
        });
    }

    observations.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(observations)
}

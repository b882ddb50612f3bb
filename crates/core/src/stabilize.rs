// crates/core/src/stabilize.rs
//! Size-stability heuristic for deciding when an artifact has finished
//! being written.
//!
//! There is no OS-level write-completion signal for files produced by the
//! external generator, only polling. A file is treated as stable once its
//! size is unchanged across two consecutive scans. This is a heuristic: a
//! file whose writer pauses for exactly one poll interval at a non-final
//! size is falsely treated as stable. A producer-side done-marker file is
//! the known hardening if that ever bites in practice.

use std::collections::HashMap;

/// Tracks last-seen sizes per filename between scans.
///
/// The tracker is a pure decision function: it never removes entries on its
/// own. The caller calls [`forget`](Self::forget) once a version has been
/// fully processed, which keeps the map bounded by the number of files
/// currently in flight rather than the total ever seen.
#[derive(Debug, Default)]
pub struct StabilizationTracker {
    last_seen: HashMap<String, u64>,
}

impl StabilizationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. Returns `true` when the size matches the
    /// previous scan's size for the same name.
    ///
    /// A name seen for the first time is always treated as still growing.
    pub fn observe(&mut self, filename: &str, size: u64) -> bool {
        match self.last_seen.get(filename) {
            Some(&prev) if prev == size => true,
            _ => {
                self.last_seen.insert(filename.to_string(), size);
                false
            }
        }
    }

    /// Drop tracking state for a name whose current version has been
    /// processed. A later re-creation under the same name starts over as
    /// "growing".
    pub fn forget(&mut self, filename: &str) {
        self.last_seen.remove(filename);
    }

    /// Number of filenames currently tracked (in-flight, not yet delivered).
    pub fn tracked(&self) -> usize {
        self.last_seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_never_stable() {
        let mut t = StabilizationTracker::new();
        assert!(!t.observe("a.md", 100));
        assert!(!t.observe("b.md", 0));
    }

    #[test]
    fn repeated_size_is_stable() {
        let mut t = StabilizationTracker::new();
        assert!(!t.observe("a.md", 100));
        assert!(t.observe("a.md", 100));
        // Stays stable until the caller forgets it.
        assert!(t.observe("a.md", 100));
    }

    #[test]
    fn growing_file_is_not_stable() {
        let mut t = StabilizationTracker::new();
        assert!(!t.observe("a.md", 100));
        assert!(!t.observe("a.md", 200));
        assert!(!t.observe("a.md", 300));
        assert!(t.observe("a.md", 300));
    }

    #[test]
    fn shrinking_file_restarts_tracking() {
        let mut t = StabilizationTracker::new();
        assert!(!t.observe("a.md", 100));
        assert!(!t.observe("a.md", 50));
        assert!(t.observe("a.md", 50));
    }

    #[test]
    fn forget_resets_to_growing() {
        let mut t = StabilizationTracker::new();
        assert!(!t.observe("a.md", 100));
        assert!(t.observe("a.md", 100));
        t.forget("a.md");
        assert_eq!(t.tracked(), 0);
        // Same name, new version: first sight again.
        assert!(!t.observe("a.md", 50));
        assert!(t.observe("a.md", 50));
    }

    #[test]
    fn tracked_counts_only_in_flight_names() {
        let mut t = StabilizationTracker::new();
        for i in 0..10 {
            t.observe(&format!("f{i}.md"), 10);
        }
        assert_eq!(t.tracked(), 10);
        for i in 0..10 {
            t.forget(&format!("f{i}.md"));
        }
        assert_eq!(t.tracked(), 0);
    }
}

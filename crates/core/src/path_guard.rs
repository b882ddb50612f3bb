// crates/core/src/path_guard.rs
//! Validation and resolution of artifact paths against the safe root.
//!
//! Every path handed to the persistence layer or the event stream must pass
//! through [`PathGuard::resolve`]. The check is deliberately two-stage: a
//! character blacklist on the decoded filename, then a canonicalization
//! containment check on the joined path. The blacklist alone is bypassable
//! by encoding tricks and platform path quirks; canonicalization is the
//! structural guarantee.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::error::SecurityViolation;

fn job_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[A-Za-z0-9_-]+$").expect("static pattern compiles"))
}

/// Resolves candidate artifact paths against a fixed safe root directory.
///
/// One instance per process, constructed once at startup with the absolute
/// root under which all job output directories live.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The safe root this guard validates against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate `job_id` without resolving any path.
    ///
    /// Used by the HTTP layer to reject malformed ids before a job directory
    /// exists.
    pub fn valid_job_id(job_id: &str) -> bool {
        job_id_pattern().is_match(job_id)
    }

    /// Validate and resolve `root / job_id / raw_filename`.
    ///
    /// `raw_filename` is URL-decoded first, then rejected if it contains
    /// `/`, `\` or `..`. The joined path is canonicalized (the file must
    /// exist at this point) and the canonical result must remain a
    /// descendant of the canonical job directory.
    pub fn resolve(&self, job_id: &str, raw_filename: &str) -> Result<PathBuf, SecurityViolation> {
        if !Self::valid_job_id(job_id) {
            return Err(SecurityViolation::InvalidJobId);
        }

        let decoded = urlencoding::decode(raw_filename)
            .map_err(|_| SecurityViolation::ForbiddenComponent)?;
        if decoded.is_empty()
            || decoded.contains('/')
            || decoded.contains('\\')
            || decoded.contains("..")
        {
            return Err(SecurityViolation::ForbiddenComponent);
        }

        let job_dir = self.root.join(job_id);
        let canonical_dir =
            std::fs::canonicalize(&job_dir).map_err(SecurityViolation::Unresolvable)?;
        let canonical = std::fs::canonicalize(job_dir.join(decoded.as_ref()))
            .map_err(SecurityViolation::Unresolvable)?;

        if !canonical.starts_with(&canonical_dir) {
            return Err(SecurityViolation::EscapesRoot);
        }

        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn guard_with_job(job_id: &str, files: &[&str]) -> (TempDir, PathGuard) {
        let root = TempDir::new().unwrap();
        let job_dir = root.path().join(job_id);
        std::fs::create_dir_all(&job_dir).unwrap();
        for f in files {
            std::fs::write(job_dir.join(f), b"content").unwrap();
        }
        let guard = PathGuard::new(root.path());
        (root, guard)
    }

    #[test]
    fn resolves_plain_filename_under_job_dir() {
        let (root, guard) = guard_with_job("job1", &["report.pdf"]);
        let resolved = guard.resolve("job1", "report.pdf").unwrap();
        let canonical_job = std::fs::canonicalize(root.path().join("job1")).unwrap();
        assert!(resolved.starts_with(&canonical_job));
        assert_eq!(resolved.file_name().unwrap(), "report.pdf");
    }

    #[test]
    fn rejects_parent_traversal() {
        let (_root, guard) = guard_with_job("job1", &[]);
        let err = guard.resolve("job1", "../../etc/passwd").unwrap_err();
        assert!(matches!(err, SecurityViolation::ForbiddenComponent));
    }

    #[test]
    fn rejects_embedded_traversal() {
        let (_root, guard) = guard_with_job("job1", &[]);
        let err = guard.resolve("job1", "a/../../b").unwrap_err();
        assert!(matches!(err, SecurityViolation::ForbiddenComponent));
    }

    #[test]
    fn rejects_url_encoded_traversal() {
        let (_root, guard) = guard_with_job("job1", &[]);
        // %2e%2e%2f decodes to "../"
        let err = guard.resolve("job1", "%2e%2e%2fsecret").unwrap_err();
        assert!(matches!(err, SecurityViolation::ForbiddenComponent));
    }

    #[test]
    fn rejects_backslash() {
        let (_root, guard) = guard_with_job("job1", &[]);
        let err = guard.resolve("job1", "a\\b.txt").unwrap_err();
        assert!(matches!(err, SecurityViolation::ForbiddenComponent));
    }

    #[test]
    fn rejects_bad_job_id() {
        let (_root, guard) = guard_with_job("job1", &["report.pdf"]);
        for bad in ["../job1", "job 1", "job/1", "", "job.1"] {
            let err = guard.resolve(bad, "report.pdf").unwrap_err();
            assert!(matches!(err, SecurityViolation::InvalidJobId), "id: {bad:?}");
        }
    }

    #[test]
    fn rejects_symlink_escaping_job_dir() {
        let (root, guard) = guard_with_job("job1", &[]);
        let outside = root.path().join("outside.txt");
        std::fs::write(&outside, b"x").unwrap();
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&outside, root.path().join("job1").join("link.txt"))
                .unwrap();
            let err = guard.resolve("job1", "link.txt").unwrap_err();
            assert!(matches!(err, SecurityViolation::EscapesRoot));
        }
    }

    #[test]
    fn missing_file_is_unresolvable() {
        let (_root, guard) = guard_with_job("job1", &[]);
        let err = guard.resolve("job1", "nope.txt").unwrap_err();
        assert!(matches!(err, SecurityViolation::Unresolvable(_)));
    }

    #[test]
    fn valid_job_id_charset() {
        assert!(PathGuard::valid_job_id("abc-123_X"));
        assert!(!PathGuard::valid_job_id("abc/123"));
        assert!(!PathGuard::valid_job_id(""));
    }
}

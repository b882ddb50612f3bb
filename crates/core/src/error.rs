// crates/core/src/error.rs
//! Error types shared across the core artifact pipeline.

use thiserror::Error;

/// A candidate job id or filename failed safety validation.
///
/// Apart from [`Unresolvable`](Self::Unresolvable), which can simply mean
/// the file vanished mid-check, these are fatal for the one file (or job
/// id) involved. Variants carry no copy of the rejected input so that the raw
/// untrusted string cannot leak into error surfaces; callers that need it
/// for auditing log it separately at `debug`.
#[derive(Debug, Error)]
pub enum SecurityViolation {
    #[error("job id contains characters outside [A-Za-z0-9_-]")]
    InvalidJobId,

    #[error("filename contains a forbidden component")]
    ForbiddenComponent,

    #[error("path could not be canonicalized")]
    Unresolvable(#[source] std::io::Error),

    #[error("resolved path escapes the job directory")]
    EscapesRoot,
}

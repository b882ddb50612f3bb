// crates/core/src/identify.rs
//! Derive an artifact type tag and an optional variant tag from a filename.
//!
//! Pure functions, no I/O. The variant convention comes from the generator:
//! translated outputs carry a short language suffix on the stem, e.g.
//! `summary_report_fr.pdf` is the `fr` variant of `summary_report.pdf`.

/// Type and variant derived from one artifact filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactIdentity {
    /// File extension, a companion-URL extension, or `"unknown"`. Never empty.
    pub artifact_type: String,
    /// Short variant tag (e.g. a language code) or the caller's default.
    pub variant: String,
}

/// Identify `filename`, consulting `companion_url` when the filename itself
/// has no extension and falling back to `default_variant` when no variant
/// suffix is present.
pub fn identify(
    filename: &str,
    companion_url: Option<&str>,
    default_variant: &str,
) -> ArtifactIdentity {
    let artifact_type = extension_of(filename)
        .or_else(|| companion_url.and_then(extension_of))
        .unwrap_or("unknown")
        .to_string();

    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };

    // More than two `_`-separated segments with a short final segment marks
    // a variant suffix. `summary_report_fr` -> fr; `summary_report` -> default.
    let segments: Vec<&str> = stem.split('_').collect();
    let variant = match segments.last() {
        Some(last) if segments.len() > 2 && !last.is_empty() && last.len() <= 3 => {
            (*last).to_string()
        }
        _ => default_variant.to_string(),
    };

    ArtifactIdentity {
        artifact_type,
        variant,
    }
}

/// Text after the last `.`, if any. A leading dot alone (`.hidden`) or a
/// trailing dot (`name.`) does not count as an extension.
fn extension_of(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

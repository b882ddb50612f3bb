// crates/db/src/migrations.rs
//! Inline SQL migrations for the genview database schema.
//!
//! Simple inline migrations rather than sqlx migration files because the
//! schema is small and self-contained.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: artifacts table
    r#"
CREATE TABLE IF NOT EXISTS artifacts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id      TEXT NOT NULL,
    path        TEXT NOT NULL,
    size_bytes  INTEGER NOT NULL DEFAULT 0,
    stage       TEXT NOT NULL DEFAULT '',
    created_at  INTEGER NOT NULL DEFAULT 0,
    updated_at  INTEGER NOT NULL DEFAULT 0,
    UNIQUE(job_id, path)
);
"#,
    // Migration 2: artifacts indexes
    r#"CREATE INDEX IF NOT EXISTS idx_artifacts_job ON artifacts(job_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_artifacts_updated ON artifacts(updated_at DESC);"#,
];

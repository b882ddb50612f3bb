// crates/db/src/queries.rs
//! Artifact record queries.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{Database, DbError, DbResult};

/// One durable artifact record, unique per `(job_id, path)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub job_id: String,
    /// Job-relative path, validated before insert.
    pub path: String,
    pub size_bytes: i64,
    /// Free-form pipeline stage tag supplied by the caller.
    pub stage: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for ArtifactRecord {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            job_id: row.try_get("job_id")?,
            path: row.try_get("path")?,
            size_bytes: row.try_get("size_bytes")?,
            stage: row.try_get("stage")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Second line of defense behind `PathGuard`: the store itself refuses
/// traversal components and absolute paths, whatever the caller did.
fn path_is_unsafe(path: &str) -> bool {
    path.is_empty()
        || path.contains("..")
        || path.starts_with('/')
        || path.starts_with('\\')
        || path.contains('\\')
}

impl Database {
    /// Upsert an artifact record keyed by `(job_id, path)`.
    ///
    /// Re-insertion updates `size_bytes`, `stage` and `updated_at` while
    /// preserving `created_at`. Safe under concurrent upserts from multiple
    /// jobs; conflict resolution happens inside SQLite.
    pub async fn upsert_artifact(
        &self,
        job_id: &str,
        path: &str,
        size_bytes: i64,
        stage: &str,
    ) -> DbResult<()> {
        if path_is_unsafe(path) {
            return Err(DbError::UnsafePath);
        }

        let now = Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO artifacts (job_id, path, size_bytes, stage, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(job_id, path) DO UPDATE SET
                size_bytes = excluded.size_bytes,
                stage = excluded.stage,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(job_id)
        .bind(path)
        .bind(size_bytes)
        .bind(stage)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// All artifact records for one job, oldest first.
    pub async fn artifacts_for_job(&self, job_id: &str) -> DbResult<Vec<ArtifactRecord>> {
        let rows = sqlx::query_as::<_, ArtifactRecord>(
            r#"
            SELECT job_id, path, size_bytes, stage, created_at, updated_at
            FROM artifacts
            WHERE job_id = ?1
            ORDER BY created_at ASC, path ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}

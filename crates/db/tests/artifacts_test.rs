// crates/db/tests/artifacts_test.rs
//! Integration tests for the artifact store upsert contract.

use genview_db::{Database, DbError};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn upsert_then_list_round_trip() {
    let db = Database::new_in_memory().await.expect("in-memory DB");

    db.upsert_artifact("job1", "job1/report.pdf", 1024, "render")
        .await
        .unwrap();
    db.upsert_artifact("job1", "job1/summary_fr.md", 512, "translate")
        .await
        .unwrap();

    let records = db.artifacts_for_job("job1").await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].path, "job1/report.pdf");
    assert_eq!(records[0].size_bytes, 1024);
    assert_eq!(records[0].stage, "render");
    assert_eq!(records[1].path, "job1/summary_fr.md");
}

#[tokio::test]
async fn upsert_same_key_updates_size_and_stage() {
    let db = Database::new_in_memory().await.expect("in-memory DB");

    db.upsert_artifact("job1", "job1/report.pdf", 100, "render")
        .await
        .unwrap();
    db.upsert_artifact("job1", "job1/report.pdf", 50, "final")
        .await
        .unwrap();

    let records = db.artifacts_for_job("job1").await.unwrap();
    assert_eq!(records.len(), 1, "same (job_id, path) must not duplicate");
    assert_eq!(records[0].size_bytes, 50);
    assert_eq!(records[0].stage, "final");
    assert!(records[0].updated_at >= records[0].created_at);
}

#[tokio::test]
async fn records_are_scoped_per_job() {
    let db = Database::new_in_memory().await.expect("in-memory DB");

    db.upsert_artifact("job1", "job1/a.md", 10, "render")
        .await
        .unwrap();
    db.upsert_artifact("job2", "job2/a.md", 20, "render")
        .await
        .unwrap();

    let job1 = db.artifacts_for_job("job1").await.unwrap();
    let job2 = db.artifacts_for_job("job2").await.unwrap();
    assert_eq!(job1.len(), 1);
    assert_eq!(job2.len(), 1);
    assert_eq!(job1[0].size_bytes, 10);
    assert_eq!(job2[0].size_bytes, 20);
}

#[tokio::test]
async fn unsafe_paths_are_rejected() {
    let db = Database::new_in_memory().await.expect("in-memory DB");

    for path in [
        "../escape.md",
        "job1/../../etc/passwd",
        "/absolute.md",
        "\\windows\\style",
        "a\\b.md",
        "",
    ] {
        let err = db
            .upsert_artifact("job1", path, 1, "render")
            .await
            .expect_err(&format!("path should be rejected: {path:?}"));
        assert!(matches!(err, DbError::UnsafePath));
    }

    assert!(db.artifacts_for_job("job1").await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_upserts_on_same_key_converge() {
    let db = Database::new_in_memory().await.expect("in-memory DB");

    let mut handles = Vec::new();
    for size in 1..=8i64 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.upsert_artifact("job1", "job1/contended.md", size, "render")
                .await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    let records = db.artifacts_for_job("job1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert!((1..=8).contains(&records[0].size_bytes));
}

#[tokio::test]
async fn record_maps_every_column() {
    let db = Database::new_in_memory().await.expect("in-memory DB");

    db.upsert_artifact("job1", "job1/full.md", 77, "translate")
        .await
        .unwrap();

    let records = db.artifacts_for_job("job1").await.unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.job_id, "job1");
    assert_eq!(r.path, "job1/full.md");
    assert_eq!(r.size_bytes, 77);
    assert_eq!(r.stage, "translate");
    assert!(r.created_at > 0);
    assert_eq!(r.updated_at, r.created_at);
}

#[tokio::test]
async fn unknown_job_lists_empty() {
    let db = Database::new_in_memory().await.expect("in-memory DB");
    assert!(db.artifacts_for_job("never-ran").await.unwrap().is_empty());
}

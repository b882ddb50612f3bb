// crates/server/src/launcher.rs
//! Launches the external generator process for one job.
//!
//! The generator is opaque to the server: any command that writes its
//! output files into the job directory works. The contract is simply
//! "blocks until the process exits".

use std::path::Path;

use tokio::process::Command;
use tracing::info;

use crate::watch::JobError;

/// Run the generator command for `job_id`, blocking until it exits.
///
/// The job id and output directory are passed through the environment so
/// arbitrary generator commands can pick them up without positional-arg
/// conventions. `kill_on_drop` ensures the child is reaped if the job task
/// is aborted on timeout.
pub async fn run_generator(
    program: &str,
    args: &[String],
    job_id: &str,
    job_dir: &Path,
) -> Result<(), JobError> {
    info!(job_id, program, "launching generator");

    let status = Command::new(program)
        .args(args)
        .env("GENVIEW_JOB_ID", job_id)
        .env("GENVIEW_OUTPUT_DIR", job_dir)
        .current_dir(job_dir)
        .kill_on_drop(true)
        .status()
        .await?;

    if status.success() {
        info!(job_id, "generator finished");
        Ok(())
    } else {
        Err(JobError::Failed(format!("generator exited with {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_command_returns_ok() {
        let dir = TempDir::new().unwrap();
        run_generator("true", &[], "job1", dir.path()).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_surfaces_exit_status() {
        let dir = TempDir::new().unwrap();
        let err = run_generator("false", &[], "job1", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Failed(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let err = run_generator("definitely-not-a-real-binary-xyz", &[], "job1", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Spawn(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn generator_runs_inside_the_job_dir() {
        let dir = TempDir::new().unwrap();
        run_generator(
            "sh",
            &["-c".to_string(), "echo hi > out.txt".to_string()],
            "job1",
            dir.path(),
        )
        .await
        .unwrap();
        assert!(dir.path().join("out.txt").exists());
    }
}

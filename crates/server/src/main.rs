// crates/server/src/main.rs
//! Genview server binary.
//!
//! Serves the artifact delivery API and runs generation jobs on request.
//! Each launched job gets a watcher that polls the job's output directory
//! and streams finished artifacts to SSE subscribers as they appear.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use genview_core::PathGuard;
use genview_db::Database;
use genview_server::state::GeneratorConfig;
use genview_server::watch::{EventRegistry, JobRunner, WatcherConfig};
use genview_server::{api_routes, AppState};

#[derive(Parser, Debug)]
#[command(name = "genview", about = "Live artifact delivery for generation jobs")]
struct Cli {
    #[arg(long, env = "GENVIEW_PORT", default_value_t = 47311)]
    port: u16,

    /// Safe root under which per-job output directories live.
    /// Defaults to the platform data dir.
    #[arg(long, env = "GENVIEW_ROOT")]
    root_dir: Option<PathBuf>,

    /// SQLite database path. Defaults to genview.db in the platform data dir.
    #[arg(long, env = "GENVIEW_DB")]
    db_path: Option<PathBuf>,

    /// Poll interval in seconds; also the stabilization window.
    #[arg(long, default_value_t = 2)]
    poll_interval_secs: u64,

    /// Overall per-job deadline in seconds.
    #[arg(long, default_value_t = 900)]
    job_timeout_secs: u64,

    /// Generator command launched for each job run.
    #[arg(long, env = "GENVIEW_GENERATOR", default_value = "genview-generate")]
    generator: String,

    /// Extra arguments passed to the generator (repeatable).
    #[arg(long = "generator-arg")]
    generator_args: Vec<String>,

    /// Variant reported for artifacts without a variant suffix.
    #[arg(long, default_value = "en")]
    default_variant: String,

    /// Stage tag stored on persisted artifact records.
    #[arg(long, default_value = "generate")]
    stage: String,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("genview")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let root_dir = cli.root_dir.unwrap_or_else(|| data_dir().join("jobs"));
    std::fs::create_dir_all(&root_dir)
        .with_context(|| format!("creating job root {}", root_dir.display()))?;
    // The safe root is resolved exactly once; every artifact path is later
    // checked for containment against it.
    let root_dir = std::fs::canonicalize(&root_dir)?;

    let db_path = cli.db_path.unwrap_or_else(|| data_dir().join("genview.db"));
    let db = Database::new(&db_path).await?;

    let events = EventRegistry::new();
    let watcher_config = WatcherConfig {
        poll_interval: Duration::from_secs(cli.poll_interval_secs.max(1)),
        default_variant: cli.default_variant,
        stage: cli.stage,
    };
    let runner = Arc::new(JobRunner::new(
        db.clone(),
        events.clone(),
        PathGuard::new(root_dir.clone()),
        watcher_config,
        Duration::from_secs(cli.job_timeout_secs),
    ));

    let state = AppState::new(
        db,
        root_dir.clone(),
        events,
        runner,
        GeneratorConfig {
            program: cli.generator,
            args: cli.generator_args,
        },
    );

    let app = api_routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, root = %root_dir.display(), "genview listening");

    axum::serve(listener, app).await?;
    Ok(())
}

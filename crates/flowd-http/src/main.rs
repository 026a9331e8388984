#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use flowd_http::{build_app, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flowd-http", version, about = "flowd control-plane daemon")]
struct Args {
    /// Bind address.
    #[arg(long, default_value = "127.0.0.1:8090")]
    bind: String,

    /// Root directory that job directories are discovered under.
    #[arg(long, default_value = ".")]
    scripts_root: PathBuf,

    /// Data directory for run artifacts. Defaults to the platform flowd data dir.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| flowd_common::paths::resolve_data_dir(None));

    let state = Arc::new(AppState::new(args.scripts_root.clone(), data_dir));
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("bind {}", args.bind))?;
    info!(bind = %args.bind, scripts_root = %args.scripts_root.display(), "flowd-http listening");

    axum::serve(listener, app).await.context("serve")
}

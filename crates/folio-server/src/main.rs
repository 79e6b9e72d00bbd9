//! folio-server
//!
//! Serves the content API and uploaded files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use folio_core::Config;
use folio_server::{app, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio-server")]
#[command(about = "folio - portfolio content API server")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/folio/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Listen address, overrides bind_addr from the config
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_env("FOLIO_LOG")
        .unwrap_or_else(|_| EnvFilter::new("folio_server=info,folio_core=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    let bind_addr = cli.bind.unwrap_or_else(|| config.bind_addr.clone());

    let state = AppState::from_config(&config);
    tokio::fs::create_dir_all(&state.uploads_dir)
        .await
        .with_context(|| format!("Failed to create {}", state.uploads_dir.display()))?;

    let router = app(state.clone(), config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!(
        "Listening on {} (uploads in {})",
        listener.local_addr()?,
        state.uploads_dir.display()
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

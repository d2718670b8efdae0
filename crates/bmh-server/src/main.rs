//! bmh-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite snapshot slot, restores the booking ledger, starts the periodic
//! auto-dispatcher and serves the JSON API over HTTP.
//!
//! ```
//! RUST_LOG=bmh_engine=debug cargo run -p bmh-server -- --config config.toml
//! ```

mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use bmh_engine::{Engine, dispatcher};
use bmh_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "BookMyHelper booking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;
  let directory = server_cfg.directory()?;

  // Open SQLite store.
  let store_path = server_cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path, server_cfg.slot.clone())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let engine = Engine::open(Arc::new(store), directory).await;
  tracing::info!(
    store = %store_path.display(),
    slot = %server_cfg.slot,
    providers = engine.directory().providers().len(),
    "store opened"
  );

  let dispatch = dispatcher::spawn(engine.clone(), server_cfg.dispatch_period());

  let app = Router::new()
    .merge(bmh_api::api_router(engine.clone()))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let served = axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error");

  dispatch.stop().await;
  engine.flush().await;
  tracing::info!("shut down");

  served
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "failed to listen for ctrl-c; serving until killed");
    std::future::pending::<()>().await;
  }
  tracing::info!("ctrl-c received, draining");
}

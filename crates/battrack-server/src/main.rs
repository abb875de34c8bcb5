//! battrack-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite event ledger, and serves the battery lifecycle API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use battrack_core::LifecycleService;
use battrack_server::{expand_tilde, load_config};
use battrack_store_sqlite::SqliteLedger;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Battery lifecycle and warranty server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = load_config(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let ledger = SqliteLedger::open(&store_path)
    .await
    .with_context(|| format!("failed to open ledger at {store_path:?}"))?;

  let service = LifecycleService::with_system_clock(ledger)
    .with_code_format(server_cfg.code_format.clone());

  let app = battrack_server::router(Arc::new(service));
  let address = server_cfg.address();

  tracing::info!(
    store = %store_path.display(),
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

//! board-server binary.
//!
//! Reads `board.toml` (or the path given with `--config`), opens the SQLite
//! store, and serves the RPC service and the REST API side by side.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use board_core::Board;
use board_rpc::{
  BoardServer, ServerConfig, rest_router,
  observe::{Exception, LogSink, Sampler, Sink},
};
use board_store_sqlite::SqliteGateway;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(author, version, about = "Discussion board server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "board.toml")]
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

  let server_cfg =
    ServerConfig::load(&cli.config).context("failed to read configuration")?;

  let sink: Arc<dyn Sink> = Arc::new(
    LogSink::new(&server_cfg.observability).context("failed to initialise observability")?,
  );

  let result = run(server_cfg, sink.clone()).await;
  if let Err(e) = &result {
    sink.capture_exception(Exception::new(format!("{e:#}")));
  }
  if !sink.flush(FLUSH_TIMEOUT) {
    tracing::warn!("observability flush timed out");
  }
  result
}

async fn run(server_cfg: ServerConfig, sink: Arc<dyn Sink>) -> anyhow::Result<()> {
  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  let gateway = SqliteGateway::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let board = Arc::new(Board::new(gateway).with_validation(server_cfg.validation));

  let sampler = Sampler::new(server_cfg.observability.traces_sample_rate)?;
  let rpc = BoardServer::builder(board.clone(), sink.clone())
    .sampler(sampler)
    .credentials(server_cfg.credentials.clone())
    .build();

  let rest = rest_router(board, sink, sampler);

  let http_address = server_cfg.http_address();
  let listener = TcpListener::bind(&http_address)
    .await
    .with_context(|| format!("failed to bind {http_address}"))?;
  tracing::info!("REST listening on http://{http_address}");

  let rpc_address = server_cfg.rpc_address();
  tokio::try_join!(
    async { rpc.serve(&rpc_address).await.context("rpc server error") },
    async { axum::serve(listener, rest).await.context("http server error") },
  )?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

//! `folio` binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and either serves the JSON API, ingests a JSON Lines file of
//! records, or inspects the stored history of one URL.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use folio_core::{chain::verify_chain, store::VersionStore};
use folio_server::{ServerConfig, ingest::ingest, load_config, open_pipeline, router};
use folio_store_sqlite::SqliteAdapter;
use tokio::{io::BufReader, net::TcpListener};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Versioned article store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API.
  Serve,
  /// Store every record in a JSON Lines file.
  Ingest {
    /// One JSON record per line.
    file: PathBuf,
  },
  /// Print every stored version of a URL.
  History { url: String },
  /// Check that a URL's version chain is intact.
  Verify { url: String },
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

  let server_cfg = load_config(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
  let store_path = expand_tilde(&server_cfg.store_path);

  match cli.command {
    Command::Serve => serve(&server_cfg, &store_path).await,
    Command::Ingest { file } => ingest_file(&server_cfg, &store_path, &file).await,
    Command::History { url } => history(&server_cfg, &store_path, &url).await,
    Command::Verify { url } => verify(&server_cfg, &store_path, &url).await,
  }
}

async fn serve(server_cfg: &ServerConfig, store_path: &Path) -> anyhow::Result<()> {
  let pipeline = open_pipeline(server_cfg, store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let app = router(pipeline);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn ingest_file(
  server_cfg: &ServerConfig,
  store_path: &Path,
  file: &Path,
) -> anyhow::Result<()> {
  let pipeline = open_pipeline(server_cfg, store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let input = tokio::fs::File::open(file)
    .await
    .with_context(|| format!("failed to open {file:?}"))?;

  let report = ingest(pipeline, BufReader::new(input), server_cfg.concurrency)
    .await
    .with_context(|| format!("failed to ingest {file:?}"))?;

  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}

async fn open_store(
  server_cfg: &ServerConfig,
  store_path: &Path,
) -> anyhow::Result<VersionStore<SqliteAdapter>> {
  let adapter = SqliteAdapter::open(store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  Ok(VersionStore::new(Arc::new(adapter), server_cfg.store.store_config()?))
}

async fn history(server_cfg: &ServerConfig, store_path: &Path, url: &str) -> anyhow::Result<()> {
  let store = open_store(server_cfg, store_path).await?;
  let entries = store
    .history(url)
    .await
    .with_context(|| format!("failed to read history of {url}"))?;
  println!("{}", serde_json::to_string_pretty(&entries)?);
  Ok(())
}

async fn verify(server_cfg: &ServerConfig, store_path: &Path, url: &str) -> anyhow::Result<()> {
  let store = open_store(server_cfg, store_path).await?;
  let entries = store
    .history(url)
    .await
    .with_context(|| format!("failed to read history of {url}"))?;
  verify_chain(&entries).with_context(|| format!("version chain of {url} is broken"))?;
  println!("{url}: {} version(s), chain intact", entries.len());
  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_err() {
    // No signal handler; run until killed.
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
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

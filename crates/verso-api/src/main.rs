//! verso-server binary.
//!
//! Reads `verso.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, binds every configured entity, and serves the
//! JSON API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use verso_api::{Collections, ServerConfig};
use verso_store_sqlite::{SqliteCollection, SqliteStore};

#[derive(Parser)]
#[command(author, version, about = "Verso versioned-record server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "verso.toml")]
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("VERSO"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.entities.is_empty() {
    tracing::warn!("no entities configured; the API will serve nothing");
  }

  // Open SQLite store.
  let store = if server_cfg.store_path == Path::new(":memory:") {
    SqliteStore::open_in_memory()
      .await
      .context("failed to open in-memory store")?
  } else {
    let store_path = expand_tilde(&server_cfg.store_path);
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?
  };

  // Bind every configured entity.
  let mut collections: Collections<SqliteCollection> = Collections::new();
  for schema in server_cfg.entities.iter().cloned() {
    let name = schema.name.clone();
    let collection = store
      .bind(schema)
      .await
      .with_context(|| format!("failed to bind entity {name:?}"))?;
    collections.insert(collection);
  }

  let app = verso_api::api_router(Arc::new(collections)).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

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

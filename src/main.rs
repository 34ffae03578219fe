use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sbgw::{cache, config, control, gateway};

#[derive(Parser, Debug)]
#[command(name = "sbgw")]
#[command(about = "A transparent response-caching gateway for sports-statistics dashboards")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/sbgw/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Run a single cleanup pass over the API cache and exit
  #[arg(long)]
  cleanup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;
  let _guard = init_tracing()?;

  let store = match &config.cache.db_path {
    Some(path) => cache::SqliteStore::open_at(path)?,
    None => cache::SqliteStore::open()?,
  };
  let gateway = gateway::Gateway::new(&config, store)?;

  if args.cleanup {
    let evicted = gateway.cleanup()?;
    tracing::info!("Cleanup pass evicted {} expired entries", evicted);
    return Ok(());
  }

  gateway.install().await?;
  gateway.activate()?;
  tracing::info!("Gateway active, cleanup every {}s", config.cache.cleanup_interval_secs);

  let control = control::ControlLoop::new(gateway.lifecycle().clone(), config.cleanup_interval());
  control.run().await
}

/// Console logging filtered by RUST_LOG plus a daily rolling file.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine data directory"))?
    .join("sbgw")
    .join("logs");
  std::fs::create_dir_all(&log_dir)?;

  let (file_writer, guard) =
    tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "sbgw.log"));

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with(tracing_subscriber::fmt::layer())
    .with(tracing_subscriber::fmt::layer().with_writer(file_writer).with_ansi(false))
    .init();

  Ok(guard)
}

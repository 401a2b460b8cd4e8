mod config;
mod database;
mod monitoring;
mod notifier;
mod pool;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::database::{Database, LibsqlStore};
use crate::monitoring::{CheckExecutor, HttpProber, Scheduler};
use crate::notifier::LogNotifier;
use crate::pool::LibsqlManager;

#[derive(Debug, Parser)]
#[command(name = "sitewatch", about = "URL monitoring and notification engine")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database path, overriding the config file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = Config::from_config(args.config.as_ref())
        .map_err(|e| anyhow!("failed to load config: {e}"))?
        .with_env_overrides();
    if let Some(db) = args.db {
        config.database.path = db.to_string_lossy().into_owned();
    }
    tracing::debug!("{config}");

    let db = libsql::Builder::new_local(&config.database.path)
        .build()
        .await
        .context("failed to open database")?;
    let pool: crate::pool::LibsqlPool = deadpool::managed::Pool::builder(LibsqlManager::new(db))
        .build()
        .context("failed to build connection pool")?;

    {
        let conn = pool.get().await?;
        database::initialize_database(&conn).await?;
    }

    let store: Arc<dyn Database> = Arc::new(LibsqlStore::new_from_pool(pool));
    let prober = Arc::new(HttpProber::new(
        Duration::from_secs(config.probe.timeout_seconds),
        config.probe.max_redirects,
    )?);
    let notifier = Arc::new(LogNotifier::new());
    let executor = Arc::new(CheckExecutor::new(Arc::clone(&store), prober, notifier));

    let scheduler = Arc::new(Scheduler::new(
        executor,
        store,
        Duration::from_millis(config.scheduler.interval_ms),
        Duration::from_millis(config.scheduler.check_delay_ms),
    ));

    if args.once {
        scheduler.run_sweep().await;
        return Ok(());
    }

    scheduler.start();

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    scheduler.stop();

    Ok(())
}

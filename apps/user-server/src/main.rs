//! REST server for user records.
//!
//! Wires the document store, the store worker, optional snapshot
//! persistence and the HTTP API together, with command-line and
//! environment configuration and graceful shutdown on Ctrl+C.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use user_api::{router::Router, server::Server};
use user_store_core::config::StoreConfig;
use user_store_core::persistence::PersistenceManager;
use user_store_core::Database;
use user_store_runtime::{FlushCommand, PersistenceWorker, Runtime};

/// Command-line arguments for the user records server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "USER_SERVER_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Data directory for snapshots; omit to keep records in memory only
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Request body read timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    request_timeout_ms: u64,

    /// Store reply timeout in milliseconds
    #[arg(long, default_value_t = 10000)]
    response_timeout_ms: u64,

    /// Maximum request body size in bytes
    #[arg(long, default_value_t = 100 * 1024)]
    max_body_bytes: usize,

    /// Capacity of the store request queue
    #[arg(long, default_value_t = 1000)]
    channel_capacity: usize,

    /// Time open connections get to finish at shutdown, in milliseconds
    #[arg(long, default_value_t = 10000)]
    shutdown_timeout_ms: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn store_config(&self) -> StoreConfig {
        StoreConfig {
            data_dir: self.data_dir.clone(),
            channel_capacity: self.channel_capacity,
            request_timeout_ms: self.request_timeout_ms,
            response_timeout_ms: self.response_timeout_ms,
            max_body_bytes: self.max_body_bytes,
            shutdown_timeout_ms: self.shutdown_timeout_ms,
            ..Default::default()
        }
    }

    fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Arc::new(args.store_config());
    let addr = args.socket_addr()?;
    let db = Arc::new(Database::new());

    // Load snapshot and start the persistence thread
    let (persistence_tx, persistence_handle) = match PersistenceManager::from_config(&config) {
        Some(manager) => {
            let loaded = manager.load(&db).with_context(|| {
                format!(
                    "Failed to load data from {}; restore the snapshot or remove it",
                    manager.data_dir().display()
                )
            })?;
            tracing::info!("Restored {} users", loaded);

            let (tx, rx) = std_mpsc::channel();
            let worker = PersistenceWorker::new(db.clone(), manager, rx);
            let handle = thread::Builder::new()
                .name("persistence".to_string())
                .spawn(move || worker.run())
                .context("Failed to spawn persistence thread")?;
            (Some(tx), Some(handle))
        }
        None => {
            tracing::info!("No data directory configured, records are kept in memory only");
            (None, None)
        }
    };

    // Start the store worker
    let (store_tx, store_rx) = mpsc::channel(config.channel_capacity);
    let mut runtime = Runtime::new(db.clone(), store_rx, persistence_tx.clone());
    let store_handle = thread::Builder::new()
        .name("store".to_string())
        .spawn(move || {
            runtime.run();
            runtime.stats()
        })
        .context("Failed to spawn store thread")?;

    let router = Router::new(config.clone(), store_tx).context("Failed to build router")?;
    let server = Server::new(addr, router);

    tracing::info!(
        host = %args.host,
        port = args.port,
        data_dir = ?config.data_dir,
        request_timeout_ms = config.request_timeout_ms,
        response_timeout_ms = config.response_timeout_ms,
        "Starting user records server"
    );

    // Returns once every connection is closed and the router is dropped
    server
        .serve_with_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // With the last request sender gone the store worker drains its queue and exits
    let store_stats = tokio::task::spawn_blocking(move || store_handle.join())
        .await
        .context("Failed to wait for store thread")?
        .map_err(|_| anyhow!("Store thread panicked"))?;
    tracing::info!(
        "Store worker stopped: processed={}, writes={}, failed={}",
        store_stats.processed,
        store_stats.writes,
        store_stats.failed
    );

    if let (Some(tx), Some(handle)) = (persistence_tx, persistence_handle) {
        tracing::info!("Flushing data before exit");
        if tx.send(FlushCommand::Shutdown).is_err() {
            tracing::error!("Persistence worker stopped before shutdown");
        }
        let stats = tokio::task::spawn_blocking(move || handle.join())
            .await
            .context("Failed to wait for persistence thread")?
            .map_err(|_| anyhow!("Persistence thread panicked"))?;
        if stats.failures > 0 {
            tracing::warn!("{} snapshot flushes failed during this run", stats.failures);
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down server..."),
        Err(e) => {
            tracing::error!("Failed to listen for ctrl_c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

//! Store worker loop.

use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use user_store_core::database::USERS_COLLECTION;
use user_store_core::Database;

use crate::handlers::{RequestOutcome, StoreHandlers};
use crate::store_request::{FlushCommand, StoreRequest};

/// Counters reported by the store worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Requests handled
    pub processed: u64,
    /// Write requests that changed the store
    pub writes: u64,
    /// Requests answered with a store error
    pub failed: u64,
}

/// Store worker applying requests one at a time
pub struct Runtime {
    /// API request receiver
    api_rx: mpsc::Receiver<StoreRequest>,
    /// Persistence channel sender (None = memory only)
    persistence_tx: Option<std_mpsc::Sender<FlushCommand>>,
    /// Request handlers
    handlers: StoreHandlers,
    /// Counters
    stats: RuntimeStats,
    /// Interval between metrics log lines
    metrics_interval: Duration,
}

impl Runtime {
    /// Create a new runtime
    pub fn new(
        database: Arc<Database>,
        api_rx: mpsc::Receiver<StoreRequest>,
        persistence_tx: Option<std_mpsc::Sender<FlushCommand>>,
    ) -> Self {
        Self {
            api_rx,
            persistence_tx,
            handlers: StoreHandlers::new(database),
            stats: RuntimeStats::default(),
            metrics_interval: Duration::from_secs(60),
        }
    }

    /// Current counters
    pub fn stats(&self) -> RuntimeStats {
        self.stats
    }

    /// Runs until every request sender is dropped.
    ///
    /// Blocks the calling thread; must not run inside an async context.
    pub fn run(&mut self) {
        tracing::info!("Store worker started");
        let mut last_metrics_log = Instant::now();

        while let Some(req) = self.api_rx.blocking_recv() {
            self.process(req);

            if last_metrics_log.elapsed() > self.metrics_interval {
                tracing::info!(
                    "Store metrics: processed={}, writes={}, failed={}",
                    self.stats.processed,
                    self.stats.writes,
                    self.stats.failed
                );
                last_metrics_log = Instant::now();
            }
        }

        tracing::info!("Request channel closed, store worker stopping");
        self.notify_persistence(FlushCommand::FlushAll);
    }

    /// Handles every request already queued without blocking.
    ///
    /// # Returns
    /// Number of requests handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(req) = self.api_rx.try_recv() {
            self.process(req);
            handled += 1;
        }
        handled
    }

    fn process(&mut self, req: StoreRequest) {
        let operation = req.operation();
        let outcome = self.handlers.handle_request(req);
        self.stats.processed += 1;
        match outcome {
            RequestOutcome::Written => {
                self.stats.writes += 1;
                self.notify_persistence(FlushCommand::FlushCollection(
                    USERS_COLLECTION.to_string(),
                ));
            }
            RequestOutcome::Failed => {
                self.stats.failed += 1;
                tracing::debug!("Store operation '{}' failed", operation);
            }
            RequestOutcome::Read | RequestOutcome::Unchanged => {}
        }
    }

    fn notify_persistence(&self, cmd: FlushCommand) {
        if let Some(tx) = &self.persistence_tx {
            if tx.send(cmd).is_err() {
                tracing::error!("Persistence worker is gone, changes will not be flushed");
            }
        }
    }
}

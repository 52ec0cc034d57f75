//! Persistence worker flushing collection snapshots.

use std::collections::BTreeSet;
use std::sync::mpsc;
use std::sync::Arc;

use user_store_core::persistence::PersistenceManager;
use user_store_core::Database;

use crate::store_request::FlushCommand;

/// Flush counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistenceStats {
    /// Commands received
    pub commands: u64,
    /// Snapshots written
    pub flushes: u64,
    /// Flush attempts that failed
    pub failures: u64,
}

/// Worker applying flush commands on its own thread.
///
/// Commands that arrive while a flush is running are coalesced, so a burst of
/// writes produces one snapshot per collection.
pub struct PersistenceWorker {
    database: Arc<Database>,
    manager: PersistenceManager,
    flush_rx: mpsc::Receiver<FlushCommand>,
    stats: PersistenceStats,
}

impl PersistenceWorker {
    pub fn new(
        database: Arc<Database>,
        manager: PersistenceManager,
        flush_rx: mpsc::Receiver<FlushCommand>,
    ) -> Self {
        Self {
            database,
            manager,
            flush_rx,
            stats: PersistenceStats::default(),
        }
    }

    /// Runs until a `Shutdown` command arrives or every sender is dropped.
    ///
    /// Always performs a final flush before returning.
    pub fn run(mut self) -> PersistenceStats {
        tracing::info!(
            "Persistence worker started, data directory {}",
            self.manager.data_dir().display()
        );

        while let Ok(first) = self.flush_rx.recv() {
            let mut pending = BTreeSet::new();
            let mut flush_all = false;
            let mut shutdown = false;

            for cmd in std::iter::once(first).chain(self.flush_rx.try_iter()) {
                self.stats.commands += 1;
                match cmd {
                    FlushCommand::FlushAll => flush_all = true,
                    FlushCommand::FlushCollection(name) => {
                        pending.insert(name);
                    }
                    FlushCommand::Shutdown => shutdown = true,
                }
            }

            if flush_all || shutdown {
                self.flush_all();
            } else {
                for name in pending {
                    self.flush_collection(&name);
                }
            }

            if shutdown {
                tracing::info!("Persistence worker received shutdown");
                return self.finish();
            }
        }

        self.flush_all();
        self.finish()
    }

    fn flush_collection(&mut self, name: &str) {
        if name != self.database.users().name() {
            tracing::error!("Collection {} not found for flush", name);
            self.stats.failures += 1;
            return;
        }
        match self.manager.flush_collection(self.database.users()) {
            Ok(true) => self.stats.flushes += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Failed to flush collection {}: {}", name, e);
                self.stats.failures += 1;
            }
        }
    }

    fn flush_all(&mut self) {
        for name in self.database.collection_names() {
            self.flush_collection(&name);
        }
    }

    fn finish(self) -> PersistenceStats {
        tracing::info!(
            "Persistence metrics: total_commands={}, successful_flushes={}, failed_flushes={}",
            self.stats.commands,
            self.stats.flushes,
            self.stats.failures
        );
        self.stats
    }
}

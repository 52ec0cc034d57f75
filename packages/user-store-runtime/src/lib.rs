//! Store worker and persistence worker.
//!
//! HTTP handlers never touch the [`Database`](user_store_core::Database)
//! directly: they send a [`StoreRequest`] over a channel and await the reply.
//! The [`Runtime`] applies requests one at a time in arrival order and
//! notifies the [`PersistenceWorker`] after every write.

mod handlers;
mod persistence_worker;
mod runtime;
mod store_request;

pub use handlers::{RequestOutcome, StoreHandlers};
pub use persistence_worker::{PersistenceStats, PersistenceWorker};
pub use runtime::{Runtime, RuntimeStats};
pub use store_request::{FlushCommand, Reply, StoreRequest};

use user_store_core::StoreError;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, StoreError>;

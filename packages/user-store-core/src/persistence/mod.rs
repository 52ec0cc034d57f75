//! Snapshot persistence for collections.
//!
//! Each collection is written to `<data_dir>/<collection>.json` through a
//! temporary file and an atomic rename. The snapshot carries a CRC32 of its
//! serialized documents, verified on load.

mod io_utils;
mod persistence_manager;
mod snapshot;

pub use io_utils::{snapshot_io_error, RetryPolicy, SnapshotIoExt};
pub use persistence_manager::PersistenceManager;
pub use snapshot::{SnapshotFile, SNAPSHOT_FORMAT_VERSION};

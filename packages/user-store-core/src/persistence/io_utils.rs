//! Error mapping and bounded retry for snapshot file I/O.

use std::io::{self, ErrorKind};
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::error::StoreError;

/// Converts an I/O failure while performing `action` on `path`.
///
/// Interruptions and timeouts become `TransientIoError` and are the only
/// failures [`RetryPolicy::run`] repeats.
pub fn snapshot_io_error(error: io::Error, action: &str, path: &Path) -> StoreError {
    let message = format!("{} {}: {}", action, path.display(), error);
    match error.kind() {
        ErrorKind::StorageFull | ErrorKind::OutOfMemory => StoreError::DiskFull(message),
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut => {
            StoreError::TransientIoError(message)
        }
        _ => StoreError::IoError(message),
    }
}

/// Attaches the failing action and file to an I/O result.
pub trait SnapshotIoExt<T> {
    fn snapshot_io(self, action: &str, path: &Path) -> Result<T, StoreError>;
}

impl<T> SnapshotIoExt<T> for io::Result<T> {
    fn snapshot_io(self, action: &str, path: &Path) -> Result<T, StoreError> {
        self.map_err(|e| snapshot_io_error(e, action, path))
    }
}

/// How often and how patiently transient snapshot failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            max_retries: config.persistence_max_retries,
            delay: Duration::from_millis(config.persistence_retry_delay_ms),
        }
    }

    /// Runs `op`, repeating it after transient failures until the retry
    /// budget is spent. Any other error is returned at once.
    pub fn run<T>(
        &self,
        mut op: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut retries = 0;
        loop {
            match op() {
                Err(StoreError::TransientIoError(msg)) if retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        retry = retries,
                        max_retries = self.max_retries,
                        "Retrying snapshot I/O: {}",
                        msg
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                }
                result => return result,
            }
        }
    }
}

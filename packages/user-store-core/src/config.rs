//! Store configuration.

use std::path::PathBuf;

/// Store and API configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Data directory for snapshot persistence (None = memory only)
    pub data_dir: Option<PathBuf>,
    /// Capacity of the request channel feeding the store worker
    pub channel_capacity: usize,
    /// Request body read timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Store reply timeout in milliseconds
    pub response_timeout_ms: u64,
    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
    /// Maximum retry attempts for transient I/O errors
    pub persistence_max_retries: u32,
    /// Delay between retry attempts in milliseconds
    pub persistence_retry_delay_ms: u64,
    /// Time open connections get to finish at shutdown, in milliseconds
    pub shutdown_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            channel_capacity: 1000,
            request_timeout_ms: 5000,        // 5 seconds default
            response_timeout_ms: 10000,      // 10 seconds default
            max_body_bytes: 100 * 1024,      // 100 KiB
            persistence_max_retries: 3,      // Default retry attempts
            persistence_retry_delay_ms: 100, // 100ms delay between retries
            shutdown_timeout_ms: 10000,      // 10 seconds to drain connections
        }
    }
}

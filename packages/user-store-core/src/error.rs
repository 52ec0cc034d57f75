//! Store error types.

use thiserror::Error;

/// Document store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Identifier is not a 24 character hex object id
    #[error("invalid user id '{0}'")]
    InvalidId(String),

    /// Field value could not be cast to the schema type
    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    /// Two documents share an identifier
    #[error("duplicate id '{id}' in collection '{collection}'")]
    DuplicateId { collection: String, id: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Lock poisoned (RwLock poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,

    /// Data corruption detected
    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    /// Disk full error during persistence
    #[error("Disk full: {0}")]
    DiskFull(String),

    /// I/O error during persistence
    #[error("I/O error: {0}")]
    IoError(String),

    /// Transient I/O error that may succeed on retry
    #[error("Transient I/O error: {0}")]
    TransientIoError(String),
}

impl StoreError {
    /// Returns true for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::InvalidId(_) | StoreError::Validation { .. })
    }
}

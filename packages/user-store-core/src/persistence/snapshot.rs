//! On-disk snapshot format.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::document::User;
use crate::error::StoreError;

/// Current snapshot format version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Serialized collection snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Format version
    pub format_version: u32,
    /// Collection name
    pub collection: String,
    /// CRC32 of the JSON-serialized documents array
    pub checksum: u32,
    /// Documents in insertion order
    pub documents: Vec<User>,
}

impl SnapshotFile {
    /// Builds a snapshot and computes its checksum.
    pub fn new(collection: &str, documents: Vec<User>) -> Result<Self, StoreError> {
        let checksum = documents_checksum(&documents)?;
        Ok(Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            collection: collection.to_string(),
            checksum,
            documents,
        })
    }

    /// Checks format version, collection name and checksum.
    pub fn validate(&self, expected_collection: &str) -> Result<(), StoreError> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::DataCorruption(format!(
                "Unsupported snapshot format version {} (expected {})",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        if self.collection != expected_collection {
            return Err(StoreError::DataCorruption(format!(
                "Snapshot belongs to collection '{}', expected '{}'",
                self.collection, expected_collection
            )));
        }
        let actual = documents_checksum(&self.documents)?;
        if actual != self.checksum {
            return Err(StoreError::DataCorruption(format!(
                "Checksum mismatch for collection '{}': expected {:08x}, got {:08x}",
                self.collection, self.checksum, actual
            )));
        }
        Ok(())
    }
}

fn documents_checksum(documents: &[User]) -> Result<u32, StoreError> {
    let bytes =
        serde_json::to_vec(documents).map_err(|e| StoreError::SerializationError(e.to_string()))?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::UserFields;

    fn sample() -> Vec<User> {
        vec![User::new(UserFields {
            name: Some("snap".to_string()),
            kind: Some("low".to_string()),
        })]
    }

    #[test]
    fn test_fresh_snapshot_validates() {
        let snapshot = SnapshotFile::new("users", sample()).unwrap();
        assert!(snapshot.validate("users").is_ok());
    }

    #[test]
    fn test_tampered_document_fails_checksum() {
        let mut snapshot = SnapshotFile::new("users", sample()).unwrap();
        snapshot.documents[0].name = Some("tampered".to_string());
        let err = snapshot.validate("users").unwrap_err();
        assert!(matches!(err, StoreError::DataCorruption(ref m) if m.contains("Checksum")));
    }

    #[test]
    fn test_wrong_collection_or_version_rejected() {
        let snapshot = SnapshotFile::new("users", sample()).unwrap();
        assert!(snapshot.validate("accounts").is_err());

        let mut future = snapshot;
        future.format_version = SNAPSHOT_FORMAT_VERSION + 1;
        assert!(future.validate("users").is_err());
    }
}

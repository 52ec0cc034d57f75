//! Persistence manager for collection snapshots.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::database::Database;
use crate::error::StoreError;

use super::io_utils::{RetryPolicy, SnapshotIoExt};
use super::snapshot::SnapshotFile;

/// Persistence manager writing and loading collection snapshots.
#[derive(Debug)]
pub struct PersistenceManager {
    /// Data directory path
    data_dir: PathBuf,
    /// Retry policy for transient I/O errors
    retry: RetryPolicy,
    /// Last flushed generation per collection
    flushed_generations: Mutex<HashMap<String, u64>>,
}

impl PersistenceManager {
    /// Creates a manager for the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>, config: &StoreConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            retry: RetryPolicy::from_config(config),
            flushed_generations: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a manager if the configuration names a data directory.
    pub fn from_config(config: &StoreConfig) -> Option<Self> {
        config
            .data_dir
            .as_ref()
            .map(|dir| Self::new(dir.clone(), config))
    }

    /// Data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the snapshot file for a collection.
    pub fn snapshot_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection))
    }

    /// Loads every collection snapshot present on disk into the database.
    ///
    /// # Returns
    /// Total number of documents loaded.
    pub fn load(&self, db: &Database) -> Result<usize, StoreError> {
        self.load_collection(db.users())
    }

    /// Loads one collection from its snapshot, if the file exists.
    pub fn load_collection(&self, collection: &Collection) -> Result<usize, StoreError> {
        let path = self.snapshot_path(collection.name());
        if !path.exists() {
            tracing::info!(
                "No snapshot for collection '{}' at {}, starting empty",
                collection.name(),
                path.display()
            );
            return Ok(0);
        }

        let contents = self.retry.run(|| read_file(&path))?;
        let snapshot: SnapshotFile = serde_json::from_str(&contents).map_err(|e| {
            StoreError::DataCorruption(format!(
                "Failed to parse snapshot {}: {}",
                path.display(),
                e
            ))
        })?;
        snapshot.validate(collection.name())?;

        let count = snapshot.documents.len();
        collection.restore(snapshot.documents)?;
        self.mark_flushed(collection.name(), collection.generation())?;
        tracing::info!(
            "Loaded {} documents into collection '{}'",
            count,
            collection.name()
        );
        Ok(count)
    }

    /// Writes a collection snapshot if it changed since the last flush.
    ///
    /// # Returns
    /// `true` if a snapshot was written.
    pub fn flush_collection(&self, collection: &Collection) -> Result<bool, StoreError> {
        let generation = collection.generation();
        if self.flushed_generation(collection.name())? == Some(generation) {
            return Ok(false);
        }

        let snapshot = SnapshotFile::new(collection.name(), collection.find_all()?)?;
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        self.retry
            .run(|| self.write_snapshot(collection.name(), &json))?;
        self.mark_flushed(collection.name(), generation)?;
        tracing::debug!(
            "Flushed collection '{}' at generation {}",
            collection.name(),
            generation
        );
        Ok(true)
    }

    /// Flushes every collection of the database.
    pub fn flush_all(&self, db: &Database) -> Result<(), StoreError> {
        self.flush_collection(db.users())?;
        Ok(())
    }

    fn write_snapshot(&self, collection: &str, json: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).snapshot_io("create directory", &self.data_dir)?;

        let temp_path = self.data_dir.join(format!("{}.json.tmp", collection));
        let final_path = self.snapshot_path(collection);

        let mut file = File::create(&temp_path).snapshot_io("create", &temp_path)?;
        file.write_all(json).snapshot_io("write", &temp_path)?;
        file.sync_all().snapshot_io("sync", &temp_path)?;

        fs::rename(&temp_path, &final_path).snapshot_io("rename into", &final_path)
    }

    fn flushed_generation(&self, collection: &str) -> Result<Option<u64>, StoreError> {
        let flushed = self
            .flushed_generations
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(flushed.get(collection).copied())
    }

    fn mark_flushed(&self, collection: &str, generation: u64) -> Result<(), StoreError> {
        let mut flushed = self
            .flushed_generations
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?;
        flushed.insert(collection.to_string(), generation);
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String, StoreError> {
    let mut file = File::open(path).snapshot_io("open", path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).snapshot_io("read", path)?;
    Ok(contents)
}

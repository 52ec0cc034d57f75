//! Snapshot persistence tests.
//!
//! Covers flush/load round trips across database instances, skipped flushes
//! for unchanged collections, and rejection of corrupted snapshots.

use std::fs;

use ntest::timeout;
use tempfile::tempdir;

use user_store_core::config::StoreConfig;
use user_store_core::persistence::{PersistenceManager, SnapshotFile};
use user_store_core::{Database, StoreError, UserFields};

fn fields(name: &str, kind: &str) -> UserFields {
    UserFields {
        name: Some(name.to_string()),
        kind: Some(kind.to_string()),
    }
}

fn manager(dir: &std::path::Path) -> PersistenceManager {
    let config = StoreConfig {
        data_dir: Some(dir.to_path_buf()),
        persistence_retry_delay_ms: 0,
        ..Default::default()
    };
    PersistenceManager::from_config(&config).unwrap()
}

#[timeout(5000)]
#[test]
fn test_snapshot_survives_restart() {
    let temp_dir = tempdir().unwrap();

    let db = Database::new();
    let first = db.users().insert(fields("test-user3", "low")).unwrap();
    let second = db.users().insert(fields("test-user4", "low")).unwrap();
    db.users()
        .replace_by_id(&second.id, fields("test-put", "high"))
        .unwrap();

    let persistence = manager(temp_dir.path());
    assert!(persistence.flush_collection(db.users()).unwrap());
    assert!(persistence.snapshot_path("users").exists());
    assert!(!temp_dir.path().join("users.json.tmp").exists());

    // Fresh process: new database and manager
    let restored = Database::new();
    let loaded = manager(temp_dir.path()).load(&restored).unwrap();
    assert_eq!(loaded, 2);
    assert_eq!(restored.users().find_all().unwrap(), db.users().find_all().unwrap());
    assert_eq!(
        restored.users().find_by_id(&first.id).unwrap(),
        Some(first)
    );
}

#[timeout(5000)]
#[test]
fn test_unchanged_collection_is_not_rewritten() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new();
    db.users().insert(fields("a", "b")).unwrap();

    let persistence = manager(temp_dir.path());
    assert!(persistence.flush_all(&db).is_ok());
    assert!(!persistence.flush_collection(db.users()).unwrap());

    db.users().insert(fields("c", "d")).unwrap();
    assert!(persistence.flush_collection(db.users()).unwrap());
}

#[test]
fn test_missing_snapshot_loads_nothing() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new();
    assert_eq!(manager(temp_dir.path()).load(&db).unwrap(), 0);
    assert!(db.users().is_empty().unwrap());
}

#[test]
fn test_corrupted_snapshot_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new();
    db.users().insert(fields("original", "low")).unwrap();
    manager(temp_dir.path()).flush_all(&db).unwrap();

    let path = temp_dir.path().join("users.json");
    let contents = fs::read_to_string(&path).unwrap();
    let mut snapshot: SnapshotFile = serde_json::from_str(&contents).unwrap();
    snapshot.documents[0].name = Some("edited by hand".to_string());
    fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

    let restored = Database::new();
    let err = manager(temp_dir.path()).load(&restored).unwrap_err();
    assert!(matches!(err, StoreError::DataCorruption(_)));
    assert!(restored.users().is_empty().unwrap());
}

#[test]
fn test_unparseable_snapshot_is_rejected() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("users.json"), b"{not json").unwrap();

    let err = manager(temp_dir.path()).load(&Database::new()).unwrap_err();
    assert!(matches!(err, StoreError::DataCorruption(ref m) if m.contains("Failed to parse")));
}

#[test]
fn test_memory_only_config_has_no_manager() {
    assert!(PersistenceManager::from_config(&StoreConfig::default()).is_none());
}

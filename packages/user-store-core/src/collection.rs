//! Insertion-ordered document collection.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::document::{User, UserFields};
use crate::error::StoreError;
use crate::object_id::ObjectId;

/// Collection of user documents.
///
/// Documents are kept in insertion order and indexed by identifier. Every
/// mutation bumps the generation counter, which persistence compares against
/// the last flushed generation.
#[derive(Debug)]
pub struct Collection {
    name: String,
    inner: RwLock<CollectionInner>,
    generation: AtomicU64,
}

#[derive(Debug, Default)]
struct CollectionInner {
    next_seq: u64,
    documents: BTreeMap<u64, User>,
    index: HashMap<ObjectId, u64>,
}

impl CollectionInner {
    fn push(&mut self, collection: &str, user: User) -> Result<(), StoreError> {
        if self.index.contains_key(&user.id) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id: user.id.to_hex(),
            });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(user.id, seq);
        self.documents.insert(seq, user);
        Ok(())
    }
}

impl Collection {
    /// Creates an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(CollectionInner::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mutation counter.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of stored documents.
    pub fn len(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.documents.len())
    }

    /// Returns true when the collection holds no documents.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Inserts a new document built from `fields` and returns it.
    pub fn insert(&self, fields: UserFields) -> Result<User, StoreError> {
        let user = User::new(fields);
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.push(&self.name, user.clone())?;
        drop(inner);
        self.bump();
        Ok(user)
    }

    /// Returns all documents in insertion order.
    pub fn find_all(&self) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.documents.values().cloned().collect())
    }

    /// Looks up a document by identifier.
    pub fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner
            .index
            .get(id)
            .and_then(|seq| inner.documents.get(seq))
            .cloned())
    }

    /// Replaces the schema fields of a document, returning the updated copy.
    ///
    /// Returns `Ok(None)` if no document has the identifier.
    pub fn replace_by_id(
        &self,
        id: &ObjectId,
        fields: UserFields,
    ) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let Some(seq) = inner.index.get(id).copied() else {
            return Ok(None);
        };
        let updated = inner.documents.get_mut(&seq).map(|user| {
            user.replace(fields);
            user.clone()
        });
        drop(inner);
        if updated.is_some() {
            self.bump();
        }
        Ok(updated)
    }

    /// Removes a document, returning its last state.
    pub fn remove_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let removed = match inner.index.remove(id) {
            Some(seq) => inner.documents.remove(&seq),
            None => None,
        };
        drop(inner);
        if removed.is_some() {
            self.bump();
        }
        Ok(removed)
    }

    /// Replaces the whole content with previously stored documents.
    ///
    /// Used when loading a snapshot; fails without modifying the collection
    /// if two documents share an identifier.
    pub fn restore(&self, documents: Vec<User>) -> Result<(), StoreError> {
        let mut rebuilt = CollectionInner::default();
        for user in documents {
            rebuilt.push(&self.name, user)?;
        }
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        *inner = rebuilt;
        Ok(())
    }
}

//! Database container owning the store's collections.

use crate::collection::Collection;

/// Name of the user collection.
pub const USERS_COLLECTION: &str = "users";

/// Database container.
#[derive(Debug)]
pub struct Database {
    users: Collection,
}

impl Database {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self {
            users: Collection::new(USERS_COLLECTION),
        }
    }

    /// The user collection.
    pub fn users(&self) -> &Collection {
        &self.users
    }

    /// Names of all collections.
    pub fn collection_names(&self) -> Vec<String> {
        vec![self.users.name().to_string()]
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

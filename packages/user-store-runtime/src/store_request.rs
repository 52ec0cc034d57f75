//! Store request types exchanged with the HTTP layer.

use tokio::sync::oneshot;
use user_store_core::{ObjectId, User, UserFields};

use crate::Result;

/// Reply channel for a store request
pub type Reply<T> = oneshot::Sender<Result<T>>;

/// Request from the REST server to the store worker
#[derive(Debug)]
pub enum StoreRequest {
    /// List every user
    ListUsers { response: Reply<Vec<User>> },
    /// Insert a user
    CreateUser {
        fields: UserFields,
        response: Reply<User>,
    },
    /// Look up a user by id
    ReadUser {
        id: ObjectId,
        response: Reply<Option<User>>,
    },
    /// Replace the fields of a user
    ReplaceUser {
        id: ObjectId,
        fields: UserFields,
        response: Reply<Option<User>>,
    },
    /// Remove a user
    DeleteUser {
        id: ObjectId,
        response: Reply<Option<User>>,
    },
}

impl StoreRequest {
    /// Returns true if this request may modify the store.
    pub fn is_write(&self) -> bool {
        match self {
            StoreRequest::ListUsers { .. } => false,
            StoreRequest::CreateUser { .. } => true,
            StoreRequest::ReadUser { .. } => false,
            StoreRequest::ReplaceUser { .. } => true,
            StoreRequest::DeleteUser { .. } => true,
        }
    }

    /// Short operation name for logging.
    pub fn operation(&self) -> &'static str {
        match self {
            StoreRequest::ListUsers { .. } => "list",
            StoreRequest::CreateUser { .. } => "create",
            StoreRequest::ReadUser { .. } => "read",
            StoreRequest::ReplaceUser { .. } => "replace",
            StoreRequest::DeleteUser { .. } => "delete",
        }
    }
}

/// Persistence flush command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushCommand {
    /// Flush all collections
    FlushAll,
    /// Flush a specific collection
    FlushCollection(String),
    /// Flush everything, then stop the worker
    Shutdown,
}

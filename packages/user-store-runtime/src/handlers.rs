//! Store request handlers

use std::sync::Arc;

use user_store_core::Database;

use crate::store_request::{Reply, StoreRequest};
use crate::Result;

/// Outcome of handling one store request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Read-only request answered
    Read,
    /// Write request changed the store
    Written,
    /// Write request matched nothing
    Unchanged,
    /// Request failed with a store error
    Failed,
}

/// Store request handlers
pub struct StoreHandlers {
    /// Database instance
    database: Arc<Database>,
}

impl StoreHandlers {
    /// Create new store handlers
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Handle a store request and send the reply
    pub fn handle_request(&self, req: StoreRequest) -> RequestOutcome {
        let users = self.database.users();
        let write = req.is_write();
        match req {
            StoreRequest::ListUsers { response } => {
                let result = users.find_all();
                let outcome = match &result {
                    Ok(list) => {
                        tracing::debug!("Listing {} users", list.len());
                        RequestOutcome::Read
                    }
                    Err(_) => RequestOutcome::Failed,
                };
                send(response, result);
                outcome
            }
            StoreRequest::CreateUser { fields, response } => {
                let result = users.insert(fields);
                if let Ok(user) = &result {
                    tracing::debug!("Created user {}", user.id);
                }
                let outcome = if result.is_ok() {
                    RequestOutcome::Written
                } else {
                    RequestOutcome::Failed
                };
                send(response, result);
                outcome
            }
            StoreRequest::ReadUser { id, response } => {
                tracing::debug!("Reading user {}", id);
                reply(response, users.find_by_id(&id), write)
            }
            StoreRequest::ReplaceUser {
                id,
                fields,
                response,
            } => {
                tracing::debug!("Replacing user {}", id);
                reply(response, users.replace_by_id(&id, fields), write)
            }
            StoreRequest::DeleteUser { id, response } => {
                tracing::debug!("Deleting user {}", id);
                reply(response, users.remove_by_id(&id), write)
            }
        }
    }
}

/// Sends a by-id result and classifies it.
fn reply<T>(response: Reply<Option<T>>, result: Result<Option<T>>, write: bool) -> RequestOutcome {
    let outcome = match &result {
        Err(_) => RequestOutcome::Failed,
        Ok(_) if !write => RequestOutcome::Read,
        Ok(Some(_)) => RequestOutcome::Written,
        Ok(None) => RequestOutcome::Unchanged,
    };
    send(response, result);
    outcome
}

fn send<T>(response: Reply<T>, result: Result<T>) {
    if let Err(e) = &result {
        tracing::warn!("Store request failed: {}", e);
    }
    if response.send(result).is_err() {
        tracing::debug!("Caller dropped before store reply was sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;
    use user_store_core::{ObjectId, UserFields};

    fn fields(name: &str) -> UserFields {
        UserFields {
            name: Some(name.to_string()),
            kind: Some("low".to_string()),
        }
    }

    #[test]
    fn test_create_then_read() {
        let handlers = StoreHandlers::new(Arc::new(Database::new()));

        let (tx, mut rx) = oneshot::channel();
        let outcome = handlers.handle_request(StoreRequest::CreateUser {
            fields: fields("a"),
            response: tx,
        });
        assert_eq!(outcome, RequestOutcome::Written);
        let created = rx.try_recv().unwrap().unwrap();

        let (tx, mut rx) = oneshot::channel();
        let outcome = handlers.handle_request(StoreRequest::ReadUser {
            id: created.id,
            response: tx,
        });
        assert_eq!(outcome, RequestOutcome::Read);
        assert_eq!(rx.try_recv().unwrap().unwrap(), Some(created));
    }

    #[test]
    fn test_delete_missing_is_unchanged() {
        let handlers = StoreHandlers::new(Arc::new(Database::new()));
        let (tx, mut rx) = oneshot::channel();
        let outcome = handlers.handle_request(StoreRequest::DeleteUser {
            id: ObjectId::new(),
            response: tx,
        });
        assert_eq!(outcome, RequestOutcome::Unchanged);
        assert_eq!(rx.try_recv().unwrap().unwrap(), None);
    }

    #[test]
    fn test_read_of_missing_user_is_not_a_write() {
        let handlers = StoreHandlers::new(Arc::new(Database::new()));
        let (tx, mut rx) = oneshot::channel();
        let outcome = handlers.handle_request(StoreRequest::ReadUser {
            id: ObjectId::new(),
            response: tx,
        });
        assert_eq!(outcome, RequestOutcome::Read);
        assert_eq!(rx.try_recv().unwrap().unwrap(), None);
    }

    #[test]
    fn test_dropped_caller_does_not_abort_write() {
        let database = Arc::new(Database::new());
        let handlers = StoreHandlers::new(database.clone());
        let (tx, rx) = oneshot::channel();
        drop(rx);
        let outcome = handlers.handle_request(StoreRequest::CreateUser {
            fields: fields("orphan"),
            response: tx,
        });
        assert_eq!(outcome, RequestOutcome::Written);
        assert_eq!(database.users().len().unwrap(), 1);
    }
}

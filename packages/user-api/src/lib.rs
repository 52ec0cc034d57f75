//! REST API server for user records.
//!
//! Provides the `/api/users` CRUD endpoints, the `/api` route listing,
//! request logging, and the hyper connection loop.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

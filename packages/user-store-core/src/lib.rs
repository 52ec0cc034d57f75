//! Embedded document store for user records.
//!
//! Provides object identifiers, the user document model, an
//! insertion-ordered collection, and JSON snapshot persistence.

pub mod collection;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod object_id;
pub mod persistence;

pub use collection::Collection;
pub use database::Database;
pub use document::{User, UserFields};
pub use error::StoreError;
pub use object_id::ObjectId;

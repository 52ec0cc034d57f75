//! HTTP endpoint implementations for the user resource and route listing.

pub mod index_handlers;
pub mod request_utils;
pub mod response;
pub mod user_handlers;

pub use index_handlers::api_index;
pub use request_utils::BoxError;
pub use response::{error_response, ErrorResponse};
pub use user_handlers::{create_user, delete_user, list_users, read_user, update_user};

//! User CRUD (Create, Read, Update, Delete) operation handlers.
//!
//! Successful responses carry the stored document itself, not a wrapper.
//! By-id operations on an unknown id answer `200` with an empty body.

use hyper::{
    body::{Body, Bytes},
    Response,
};
use user_store_core::{User, UserFields};
use user_store_runtime::StoreRequest;

use crate::router::{AppState, RouterError};

use super::request_utils::{
    build_empty_response, call_store, json_response, map_store_error, parse_json_object,
    parse_user_id, read_request_body_with_timeout, BoxError,
};

/// Lists every user.
///
/// # Endpoint
/// `GET /api/users`
///
/// # Response
/// - **200 OK**: JSON array of users in insertion order
/// ```json
/// [
///   { "_id": "65f1c2a9e4b0a1b2c3d4e5f6", "name": "test-user3", "type": "low", "__v": 0 }
/// ]
/// ```
///
/// # Example
/// ```bash
/// curl http://localhost:8080/api/users
/// ```
pub async fn list_users(state: AppState) -> Result<Response<Bytes>, RouterError> {
    let users = call_store(&state, |response| StoreRequest::ListUsers { response }).await?;
    json_response(200, &users)
}

/// Creates a user.
///
/// # Endpoint
/// `POST /api/users`
///
/// # Request Body
/// ```json
/// { "name": "test-user3", "type": "low" }
/// ```
///
/// # Response
/// - **200 OK**: The stored document with its assigned `_id` and `__v`
///
/// # Errors
/// - **400 Bad Request**: Body is not a JSON object ("problem parsing JSON: ...")
///   or a field cannot be cast to a string
/// - **413 Payload Too Large**: Body exceeds the configured limit
///
/// # Example
/// ```bash
/// curl -X POST http://localhost:8080/api/users \
///   -H "Content-Type: application/json" \
///   -d '{"name": "test-user3", "type": "low"}'
/// ```
pub async fn create_user<B>(body: B, state: AppState) -> Result<Response<Bytes>, RouterError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let fields = read_user_fields(body, &state).await?;
    let user = call_store(&state, |response| StoreRequest::CreateUser { fields, response }).await?;
    tracing::info!("Created user {}", user.id);
    json_response(200, &user)
}

/// Reads a user.
///
/// # Endpoint
/// `GET /api/users/{id}`
///
/// # Response
/// - **200 OK**: The stored document, or an empty body if no user has the id
///
/// # Errors
/// - **400 Bad Request**: The id is not a 24 character hex object id
pub async fn read_user(id: &str, state: AppState) -> Result<Response<Bytes>, RouterError> {
    let id = parse_user_id(id)?;
    let user = call_store(&state, |response| StoreRequest::ReadUser { id, response }).await?;
    optional_user_response(user)
}

/// Replaces a user's fields.
///
/// # Endpoint
/// `PUT /api/users/{id}`
///
/// # Request Body
/// The full record; `_id` and `__v` are ignored, omitted fields are cleared.
/// ```json
/// { "name": "test-put", "type": "low" }
/// ```
///
/// # Response
/// - **200 OK**: The updated document, or an empty body if no user has the id
///
/// # Errors
/// - **400 Bad Request**: Invalid id, malformed body, or uncastable field
pub async fn update_user<B>(
    id: &str,
    body: B,
    state: AppState,
) -> Result<Response<Bytes>, RouterError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let id = parse_user_id(id)?;
    let fields = read_user_fields(body, &state).await?;
    let user = call_store(&state, |response| StoreRequest::ReplaceUser {
        id,
        fields,
        response,
    })
    .await?;
    if let Some(user) = &user {
        tracing::info!("Updated user {}", user.id);
    }
    optional_user_response(user)
}

/// Deletes a user.
///
/// # Endpoint
/// `DELETE /api/users/{id}`
///
/// # Response
/// - **200 OK**: The document as it was before deletion, or an empty body if
///   no user has the id
pub async fn delete_user(id: &str, state: AppState) -> Result<Response<Bytes>, RouterError> {
    let id = parse_user_id(id)?;
    let user = call_store(&state, |response| StoreRequest::DeleteUser { id, response }).await?;
    if let Some(user) = &user {
        tracing::info!("Deleted user {}", user.id);
    }
    optional_user_response(user)
}

async fn read_user_fields<B>(body: B, state: &AppState) -> Result<UserFields, RouterError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let bytes = read_request_body_with_timeout(
        body,
        state.config.request_timeout_ms,
        state.config.max_body_bytes,
    )
    .await?;
    let object = parse_json_object(&bytes)?;
    UserFields::from_json(&object).map_err(map_store_error)
}

fn optional_user_response(user: Option<User>) -> Result<Response<Bytes>, RouterError> {
    match user {
        Some(user) => json_response(200, &user),
        None => build_empty_response(200),
    }
}

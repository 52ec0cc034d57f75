//! Route discovery handler.

use hyper::{body::Bytes, Response};

use crate::router::{RouterError, ROUTES};

use super::request_utils::json_response;
use super::response::RouteListResponse;

/// Lists the available routes.
///
/// # Endpoint
/// `GET /api`
///
/// # Response
/// - **200 OK**
/// ```json
/// {
///   "routes": ["GET /api", "GET /api/users", "POST /api/users", "..."]
/// }
/// ```
pub fn api_index() -> Result<Response<Bytes>, RouterError> {
    let listing = RouteListResponse {
        routes: ROUTES
            .iter()
            .map(|route| format!("{} {}", route.method, route.path))
            .collect(),
    };
    json_response(200, &listing)
}

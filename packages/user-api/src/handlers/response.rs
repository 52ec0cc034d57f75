//! Response types and helpers for HTTP endpoints.

use serde::Serialize;

/// Error body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// HTTP status code
    pub status: u16,
    /// Error message
    pub message: String,
    /// Optional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Helper to create error response
pub fn error_response(status: u16, message: String, details: Option<String>) -> ErrorResponse {
    ErrorResponse {
        status,
        message,
        details,
    }
}

/// Body of `GET /api`
#[derive(Debug, Serialize)]
pub struct RouteListResponse {
    /// Routes formatted as `METHOD /path`
    pub routes: Vec<String>,
}

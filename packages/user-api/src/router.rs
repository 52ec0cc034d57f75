//! Matchit routing configuration.

use std::sync::Arc;

use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Method, Request, Response};
use matchit::Router as MatchitRouter;
use tokio::sync::mpsc;

use crate::handlers::{self, error_response, BoxError};
use crate::middleware;
use user_store_core::config::StoreConfig;
use user_store_runtime::StoreRequest;

/// A route advertised by `GET /api`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSpec {
    pub method: &'static str,
    pub path: &'static str,
}

/// Every route the API serves, in listing order.
pub const ROUTES: &[RouteSpec] = &[
    RouteSpec { method: "GET", path: "/api" },
    RouteSpec { method: "GET", path: "/api/users" },
    RouteSpec { method: "POST", path: "/api/users" },
    RouteSpec { method: "GET", path: "/api/users/:id" },
    RouteSpec { method: "PUT", path: "/api/users/:id" },
    RouteSpec { method: "DELETE", path: "/api/users/:id" },
];

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Store and API configuration
    pub config: Arc<StoreConfig>,
    /// Request sender to the store worker
    pub store_tx: mpsc::Sender<StoreRequest>,
}

/// HTTP request router.
pub struct Router {
    inner: MatchitRouter<RouteHandler>,
    state: AppState,
}

impl Router {
    /// Creates a new router with the user routes.
    pub fn new(
        config: Arc<StoreConfig>,
        store_tx: mpsc::Sender<StoreRequest>,
    ) -> Result<Self, matchit::InsertError> {
        let mut router = MatchitRouter::new();
        router.insert("/api", RouteHandler::Index)?;
        router.insert("/api/users", RouteHandler::Users)?;
        router.insert("/api/users/{id}", RouteHandler::User)?;

        Ok(Self {
            inner: router,
            state: AppState { config, store_tx },
        })
    }

    /// Shared state handed to handlers.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Handles a request end to end: routing, error conversion and
    /// request logging. Never fails; errors become JSON error responses.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Bytes>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        middleware::trace_request(req, |req| async move {
            self.route(req).await.unwrap_or_else(Response::from)
        })
        .await
    }

    /// Routes an incoming request to the appropriate handler.
    ///
    /// # Returns
    /// `Result<Response<Bytes>, RouterError>` containing the response or an error.
    pub async fn route<B>(&self, req: Request<B>) -> Result<Response<Bytes>, RouterError>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let path = normalize_path(req.uri().path()).to_string();

        match self.inner.at(&path) {
            Ok(matched) => {
                let handler = *matched.value;
                let id = matched.params.get("id").map(str::to_string);
                handler.handle(req, id, self.state.clone()).await
            }
            Err(_) => Err(RouterError::NotFound(format!("No route found for {}", path))),
        }
    }
}

/// Strips one trailing slash so `/api/users/` routes like `/api/users`.
fn normalize_path(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

/// Route handler function.
#[derive(Debug, Clone, Copy)]
enum RouteHandler {
    Index,
    Users,
    User,
}

impl RouteHandler {
    /// Methods accepted on the route, as sent in an `Allow` header.
    fn allowed(&self) -> &'static str {
        match self {
            RouteHandler::Index => "GET",
            RouteHandler::Users => "GET, POST",
            RouteHandler::User => "GET, PUT, DELETE",
        }
    }

    /// Handles a request with the given `:id` parameter.
    async fn handle<B>(
        &self,
        req: Request<B>,
        id: Option<String>,
        state: AppState,
    ) -> Result<Response<Bytes>, RouterError>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        match (self, parts.method, id) {
            (RouteHandler::Index, Method::GET, _) => handlers::api_index(),
            (RouteHandler::Users, Method::GET, _) => handlers::list_users(state).await,
            (RouteHandler::Users, Method::POST, _) => handlers::create_user(body, state).await,
            (RouteHandler::User, Method::GET, Some(id)) => handlers::read_user(&id, state).await,
            (RouteHandler::User, Method::PUT, Some(id)) => {
                handlers::update_user(&id, body, state).await
            }
            (RouteHandler::User, Method::DELETE, Some(id)) => {
                handlers::delete_user(&id, state).await
            }
            _ => Err(RouterError::MethodNotAllowed {
                allow: self.allowed(),
            }),
        }
    }
}

/// Router error type.
#[derive(Debug)]
pub enum RouterError {
    MethodNotAllowed { allow: &'static str },
    InternalError(String),
    Timeout,
    StoreTimeout,
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(usize),
    ServiceUnavailable(String),
}

impl RouterError {
    /// HTTP status code for the error.
    pub fn status(&self) -> u16 {
        match self {
            RouterError::MethodNotAllowed { .. } => 405,
            RouterError::InternalError(_) => 500,
            RouterError::Timeout => 408,
            RouterError::StoreTimeout => 504,
            RouterError::BadRequest(_) => 400,
            RouterError::NotFound(_) => 404,
            RouterError::PayloadTooLarge(_) => 413,
            RouterError::ServiceUnavailable(_) => 503,
        }
    }
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::MethodNotAllowed { .. } => write!(f, "Method Not Allowed"),
            RouterError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            RouterError::Timeout => write!(f, "Request Timeout"),
            RouterError::StoreTimeout => write!(f, "Store did not reply in time"),
            RouterError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            RouterError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            RouterError::PayloadTooLarge(limit) => {
                write!(f, "request entity too large (limit {} bytes)", limit)
            }
            RouterError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
        }
    }
}

impl std::error::Error for RouterError {}

impl From<RouterError> for Response<Bytes> {
    fn from(err: RouterError) -> Self {
        let status = err.status();
        let (message, details) = match &err {
            RouterError::NotFound(msg) => ("Not Found".to_string(), Some(msg.clone())),
            RouterError::BadRequest(msg) => (msg.clone(), None),
            RouterError::InternalError(_) => {
                tracing::error!("Internal error: {}", err);
                ("Internal Server Error".to_string(), None)
            }
            RouterError::MethodNotAllowed { allow } => {
                (err.to_string(), Some(format!("Allowed methods: {}", allow)))
            }
            _ => (err.to_string(), None),
        };

        let error_response = error_response(status, message, details);
        let body = serde_json::to_vec(&error_response).unwrap_or_else(|e| {
            format!(
                "{{\"status\":500,\"message\":\"Failed to serialize error: {}\"}}",
                e
            )
            .into_bytes()
        });

        let mut response = Response::new(Bytes::from(body));
        *response.status_mut() = hyper::StatusCode::from_u16(status)
            .unwrap_or(hyper::StatusCode::INTERNAL_SERVER_ERROR);
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let RouterError::MethodNotAllowed { allow } = err {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/api/users/"), "/api/users");
        assert_eq!(normalize_path("/api/users"), "/api/users");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_listed_routes_match_registered_routes() {
        let (store_tx, _store_rx) = mpsc::channel(1);
        let router = Router::new(Arc::new(StoreConfig::default()), store_tx).unwrap();

        for route in ROUTES {
            let path = route.path.replace(":id", "65f1c2a9e4b0a1b2c3d4e5f6");
            let matched = router
                .inner
                .at(&path)
                .unwrap_or_else(|_| panic!("{} is listed but not routed", route.path));
            assert!(
                matched.value.allowed().split(", ").any(|m| m == route.method),
                "{} {} is listed but not allowed",
                route.method,
                route.path
            );
        }

        let served: usize = [RouteHandler::Index, RouteHandler::Users, RouteHandler::User]
            .iter()
            .map(|handler| handler.allowed().split(", ").count())
            .sum();
        assert_eq!(served, ROUTES.len());
    }

    #[test]
    fn test_error_statuses() {
        let cases = [
            (RouterError::BadRequest("x".into()), 400),
            (RouterError::NotFound("x".into()), 404),
            (RouterError::MethodNotAllowed { allow: "GET" }, 405),
            (RouterError::Timeout, 408),
            (RouterError::PayloadTooLarge(10), 413),
            (RouterError::InternalError("x".into()), 500),
            (RouterError::ServiceUnavailable("x".into()), 503),
            (RouterError::StoreTimeout, 504),
        ];
        for (err, status) in cases {
            let response = Response::from(err);
            assert_eq!(response.status().as_u16(), status);
            assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        }
    }

    #[test]
    fn test_bad_request_message_is_kept_verbatim() {
        let response = Response::from(RouterError::BadRequest(
            "problem parsing JSON: EOF".to_string(),
        ));
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["status"], 400);
        assert_eq!(body["message"], "problem parsing JSON: EOF");
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let response = Response::from(RouterError::MethodNotAllowed {
            allow: "GET, POST",
        });
        assert_eq!(response.headers()[ALLOW], "GET, POST");
    }
}

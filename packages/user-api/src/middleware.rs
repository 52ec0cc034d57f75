//! Request logging middleware.
//!
//! Every request runs inside a `request` span carrying a request id, the
//! method and the path. The id is taken from an incoming `x-request-id`
//! header when it is present and well formed, otherwise generated, and is
//! echoed back on the response.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use hyper::body::Bytes;
use hyper::header::HeaderValue;
use hyper::{Request, Response};
use tracing::Instrument;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 64;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Runs `next` inside a request span and logs the outcome.
pub async fn trace_request<B, F, Fut>(req: Request<B>, next: F) -> Response<Bytes>
where
    F: FnOnce(Request<B>) -> Fut,
    Fut: Future<Output = Response<Bytes>>,
{
    let request_id = incoming_request_id(&req).unwrap_or_else(generate_request_id);
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path
    );

    let started = Instant::now();
    let mut response = next(req).instrument(span.clone()).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    span.in_scope(|| {
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), elapsed_ms, "request failed");
        } else if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), elapsed_ms, "request rejected");
        } else {
            tracing::info!(status = status.as_u16(), elapsed_ms, "request completed");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn incoming_request_id<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map(str::to_string)
}

fn generate_request_id() -> String {
    format!("{:016x}", NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok(_req: Request<()>) -> Response<Bytes> {
        Response::new(Bytes::new())
    }

    #[tokio::test]
    async fn test_generates_request_id() {
        let first = trace_request(Request::new(()), ok).await;
        let second = trace_request(Request::new(()), ok).await;
        let a = first.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        let b = second.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_propagates_incoming_request_id() {
        let req = Request::builder()
            .header(REQUEST_ID_HEADER, "client-abc-123")
            .body(())
            .unwrap();
        let response = trace_request(req, ok).await;
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "client-abc-123");
    }

    #[tokio::test]
    async fn test_replaces_malformed_request_id() {
        let req = Request::builder()
            .header(REQUEST_ID_HEADER, "x".repeat(MAX_REQUEST_ID_LEN + 1))
            .body(())
            .unwrap();
        let response = trace_request(req, ok).await;
        assert_eq!(response.headers()[REQUEST_ID_HEADER].len(), 16);
    }
}

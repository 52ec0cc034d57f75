//! Request utilities for HTTP endpoints.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::Response;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot;
use tokio::time;

use crate::router::{AppState, RouterError};
use user_store_core::{ObjectId, StoreError};
use user_store_runtime::{Reply, StoreRequest};

/// Boxed error accepted from request bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Prefix of every malformed-body message
pub const PARSE_ERROR_PREFIX: &str = "problem parsing JSON";

/// Reads a request body, bounded by a timeout and a size limit.
pub async fn read_request_body_with_timeout<B>(
    body: B,
    timeout_ms: u64,
    max_bytes: usize,
) -> Result<Bytes, RouterError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let timeout_duration = time::Duration::from_millis(timeout_ms);
    let collected = time::timeout(timeout_duration, Limited::new(body, max_bytes).collect())
        .await
        .map_err(|_| RouterError::Timeout)?
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                RouterError::PayloadTooLarge(max_bytes)
            } else {
                RouterError::InternalError(format!("Failed to read request body: {}", e))
            }
        })?;
    Ok(collected.to_bytes())
}

/// Waits for a store reply with timeout
pub async fn wait_for_response_with_timeout<T>(
    rx: oneshot::Receiver<T>,
    timeout_ms: u64,
) -> Result<T, RouterError> {
    let timeout_duration = time::Duration::from_millis(timeout_ms);
    time::timeout(timeout_duration, rx)
        .await
        .map_err(|_| RouterError::StoreTimeout)?
        .map_err(|e| RouterError::InternalError(format!("Response channel closed: {}", e)))
}

/// Sends a request to the store worker and waits for its reply.
///
/// A full queue is reported as 503 rather than waiting for capacity.
pub async fn call_store<T>(
    state: &AppState,
    build: impl FnOnce(Reply<T>) -> StoreRequest,
) -> Result<T, RouterError> {
    let (tx, rx) = oneshot::channel();
    state.store_tx.try_send(build(tx)).map_err(|e| match e {
        TrySendError::Full(_) => RouterError::ServiceUnavailable("store queue is full".to_string()),
        TrySendError::Closed(_) => {
            RouterError::InternalError("store worker is not running".to_string())
        }
    })?;

    let result = wait_for_response_with_timeout(rx, state.config.response_timeout_ms).await?;
    result.map_err(map_store_error)
}

/// Map StoreError to appropriate RouterError
pub fn map_store_error(e: StoreError) -> RouterError {
    if e.is_client_error() {
        RouterError::BadRequest(e.to_string())
    } else {
        RouterError::InternalError(format!("Store error: {}", e))
    }
}

/// Parses a request body as a JSON object.
///
/// The body is parsed regardless of its declared content type. Empty bodies
/// and JSON values other than objects are rejected as malformed.
pub fn parse_json_object(body: &[u8]) -> Result<Map<String, Value>, RouterError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RouterError::BadRequest(format!(
            "{}: request body is empty",
            PARSE_ERROR_PREFIX
        )));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(RouterError::BadRequest(format!(
            "{}: request body must be a JSON object",
            PARSE_ERROR_PREFIX
        ))),
        Err(e) => Err(RouterError::BadRequest(format!(
            "{}: {}",
            PARSE_ERROR_PREFIX, e
        ))),
    }
}

/// Decodes and parses the `:id` path segment.
pub fn parse_user_id(raw: &str) -> Result<ObjectId, RouterError> {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    decoded.parse().map_err(map_store_error)
}

/// Serializes `data` into a JSON response
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Bytes>, RouterError> {
    let json = serde_json::to_vec(data)
        .map_err(|e| RouterError::InternalError(format!("Failed to serialize response: {}", e)))?;
    build_response(status, json)
}

/// Helper to build HTTP response with proper error handling
pub fn build_response(status: u16, json: Vec<u8>) -> Result<Response<Bytes>, RouterError> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from(json))
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

/// Helper to build an empty HTTP response
pub fn build_empty_response(status: u16) -> Result<Response<Bytes>, RouterError> {
    Response::builder()
        .status(status)
        .header(CONTENT_LENGTH, "0")
        .body(Bytes::new())
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    fn message(err: RouterError) -> String {
        match err {
            RouterError::BadRequest(msg) => msg,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_json_object_rejects_malformed_input() {
        let bodies: [&[u8]; 5] = [b"{\"invalid\"}", b"", b"  \n", b"[1,2]", b"\"text\""];
        for body in bodies {
            let msg = message(parse_json_object(body).unwrap_err());
            assert!(msg.contains("problem parsing"), "{}", msg);
        }
    }

    #[test]
    fn test_parse_json_object_accepts_objects() {
        let object = parse_json_object(br#"{"name":"a","type":"b"}"#).unwrap();
        assert_eq!(object["name"], "a");
    }

    #[test]
    fn test_parse_user_id() {
        let id = ObjectId::new();
        assert_eq!(parse_user_id(&id.to_hex()).unwrap(), id);
        let msg = message(parse_user_id("nope").unwrap_err());
        assert_eq!(msg, "invalid user id 'nope'");
    }

    #[test]
    fn test_empty_response_has_zero_length() {
        let response = build_empty_response(200).unwrap();
        assert_eq!(response.headers()[CONTENT_LENGTH], "0");
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let body = Full::new(Bytes::from(vec![b'x'; 64]));
        let err = read_request_body_with_timeout(body, 1000, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::PayloadTooLarge(16)));
    }

    #[tokio::test]
    async fn test_body_within_limit_is_returned() {
        let body = Full::new(Bytes::from_static(b"{}"));
        let bytes = read_request_body_with_timeout(body, 1000, 16).await.unwrap();
        assert_eq!(&bytes[..], b"{}");
    }
}

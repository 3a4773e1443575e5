//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) for every inbound request
//! - Prepare the outbound copy of a request for a backend

use axum::body::Body;
use axum::http::{header, request, HeaderValue, Request, Uri, Version};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::response::strip_hop_by_hop;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Issues a UUID v4 for requests that arrive without `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of an inbound request, or "unknown".
pub fn request_id(parts: &request::Parts) -> String {
    parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Original path and query, exactly as received.
pub fn path_and_query(uri: &Uri) -> &str {
    uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
}

/// Build the request sent to a backend: same method, headers and body,
/// new target. Hop-by-hop headers and `Host` are dropped; the client
/// derives `Host` from the target.
pub fn build_forward_request(
    parts: request::Parts,
    body: Body,
    target: Uri,
) -> Result<Request<Body>, axum::http::Error> {
    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    let mut outbound = Request::builder()
        .method(parts.method)
        .uri(target)
        .version(Version::HTTP_11)
        .body(body)?;
    *outbound.headers_mut() = headers;
    Ok(outbound)
}

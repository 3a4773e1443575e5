//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay backend responses (status, headers, body) to the caller
//! - Strip hop-by-hop headers
//! - Build the JSON bodies for conditions the balancer answers itself

use axum::body::{Body, Bytes};
use axum::http::{header, response, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

pub const NO_HEALTHY_BACKEND: &str = "No healthy backend available";
pub const FORWARDING_FAILED: &str = "Error forwarding request";

/// Headers that describe a single connection and must not be relayed.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// JSON body for responses generated by the balancer itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// 503: selection found no healthy backend.
pub fn no_healthy_backend() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, NO_HEALTHY_BACKEND)
}

/// 500: the backend never produced a usable response.
pub fn forwarding_failed() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, FORWARDING_FAILED)
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Rebuild a backend response for the caller. Status and body are passed
/// through untouched.
pub fn relay(mut parts: response::Parts, body: Bytes) -> Response {
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn canned_error_bodies() {
        let r = no_healthy_backend();
        assert_eq!(r.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(r).await, serde_json::json!({"message": "No healthy backend available"}));

        let r = forwarding_failed();
        assert_eq!(r.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(r).await, serde_json::json!({"message": "Error forwarding request"}));
    }

    #[test]
    fn strips_hop_by_hop_and_connection_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session-hop"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session-hop", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }
}

//! Request forwarding.
//!
//! # Flow
//! ```text
//! select healthy backend ── none ──▶ 503 {"message": "No healthy backend available"}
//!     │
//! begin_request (guard)
//!     │
//! forward with timeout ── transport failure ──▶ 500 {"message": "Error forwarding request"}
//!     │
//! relay status + body (backend errors included)
//!     │
//! guard dropped → end_request
//! ```
//!
//! A failed forward is reported to the caller; it is never retried on another backend.

use axum::body::{self, Body};
use axum::extract::State;
use axum::http::{Request, Uri};
use axum::response::Response;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time;

use crate::http::client::error_chain;
use crate::http::request::{build_forward_request, path_and_query, request_id};
use crate::http::response::{forwarding_failed, no_healthy_backend, relay};
use crate::http::server::AppState;
use crate::load_balancer::backend::Backend;
use crate::observability::metrics;

/// Why a forward produced no usable backend response.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid target URI `{0}`")]
    InvalidUri(String),

    #[error("failed to build upstream request: {0}")]
    Build(#[from] axum::http::Error),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream connection failed: {0}")]
    Transport(String),

    #[error("failed to read upstream body (max_response_bytes = {limit}): {reason}")]
    Body { limit: usize, reason: String },
}

/// Main proxy handler: selects a backend and forwards the request.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let Some(backend) = state.selector.select(&state.registry) else {
        tracing::warn!(method = %method, path = %request.uri().path(), "No healthy backend available");
        metrics::record_request(&method, 503, metrics::NO_BACKEND, start);
        return no_healthy_backend();
    };

    let guard = state
        .registry
        .begin_request(backend.address())
        .unwrap_or_else(|| backend.begin_request());
    metrics::record_active_connections(guard.address(), guard.active_connections());

    let result = forward(&state, &guard, request).await;

    drop(guard);
    metrics::record_active_connections(backend.address(), backend.active_connections());

    match result {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), backend.address(), start);
            response
        }
        Err(e) => {
            tracing::error!(backend = %backend.address(), error = %e, "Error forwarding request");
            metrics::record_request(&method, 500, backend.address(), start);
            forwarding_failed()
        }
    }
}

/// Send one request to `backend` and buffer its response, all within the
/// forwarding timeout.
async fn forward(state: &AppState, backend: &Backend, request: Request<Body>) -> Result<Response, ForwardError> {
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts);

    let target = backend.target(path_and_query(&parts.uri));
    let uri: Uri = target.parse().map_err(|_| ForwardError::InvalidUri(target.clone()))?;
    let outbound = build_forward_request(parts, body, uri)?;

    tracing::debug!(
        request_id = %request_id,
        method = %outbound.method(),
        target = %target,
        "Forwarding request"
    );

    let exchange = async {
        let response = state
            .client
            .request(outbound)
            .await
            .map_err(|e| ForwardError::Transport(error_chain(&e)))?;

        let (parts, body) = response.into_parts();
        let bytes = body::to_bytes(Body::new(body), state.max_response_bytes)
            .await
            .map_err(|e| ForwardError::Body {
                limit: state.max_response_bytes,
                reason: e.to_string(),
            })?;

        if !parts.status.is_success() {
            tracing::debug!(request_id = %request_id, status = %parts.status, "Relaying backend error status");
        }
        Ok::<_, ForwardError>(relay(parts, bytes))
    };

    time::timeout(state.forward_timeout, exchange)
        .await
        .map_err(|_| ForwardError::Timeout(state.forward_timeout))?
}

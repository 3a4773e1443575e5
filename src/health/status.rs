//! Probe outcome evaluation.
//!
//! A backend is alive when its health endpoint answers with a JSON body whose
//! `status` field is exactly `"ok"` or exactly `"UP"`. Both spellings are
//! matched literally; other casings are not accepted.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Status tokens that mark a backend alive.
pub const ACCEPTED_STATUS_TOKENS: [&str; 2] = ["ok", "UP"];

/// Why a probe marked a backend unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("invalid probe URL `{0}`")]
    InvalidUri(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Transport(String),

    #[error("non-success status {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("body is not JSON: {0}")]
    InvalidJson(String),

    #[error("body has no `status` field")]
    MissingStatus,

    #[error("unexpected status `{0}`")]
    UnexpectedStatus(String),
}

impl ProbeFailure {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeFailure::InvalidUri(_) => "invalid_uri",
            ProbeFailure::Timeout(_) => "timeout",
            ProbeFailure::Transport(_) => "transport",
            ProbeFailure::Status(_) => "status",
            ProbeFailure::Body(_) => "body",
            ProbeFailure::InvalidJson(_) => "invalid_json",
            ProbeFailure::MissingStatus => "missing_status",
            ProbeFailure::UnexpectedStatus(_) => "unexpected_status",
        }
    }
}

/// Check a health endpoint body.
pub fn evaluate_body(body: &[u8]) -> Result<(), ProbeFailure> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ProbeFailure::InvalidJson(e.to_string()))?;

    match value.get("status") {
        None | Some(Value::Null) => Err(ProbeFailure::MissingStatus),
        Some(Value::String(token)) if ACCEPTED_STATUS_TOKENS.contains(&token.as_str()) => Ok(()),
        Some(Value::String(token)) => Err(ProbeFailure::UnexpectedStatus(token.clone())),
        Some(other) => Err(ProbeFailure::UnexpectedStatus(other.to_string())),
    }
}

//! Configuration validation.
//!
//! Serde handles syntax; this module checks that the values describe a
//! balancer that can actually start. Every problem is reported, not just the
//! first one.

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::LbConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backends configured (set BACKEND_URLS or `backends`)")]
    NoBackends,

    #[error("backend `{address}` is not a valid URL: {reason}")]
    InvalidBackend { address: String, reason: String },

    #[error("backend `{0}` uses an unsupported scheme (expected http)")]
    UnsupportedScheme(String),

    #[error("backend `{0}` is configured more than once")]
    DuplicateBackend(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("health_check.timeout_ms ({timeout_ms}) must be shorter than health_check.interval_ms ({interval_ms})")]
    ProbeTimeoutTooLong { timeout_ms: u64, interval_ms: u64 },

    #[error("forwarding.timeout_ms ({forward_ms}) must be longer than health_check.timeout_ms ({probe_ms})")]
    ForwardTimeoutTooShort { forward_ms: u64, probe_ms: u64 },

    #[error("health_check.path `{0}` must start with '/'")]
    InvalidProbePath(String),
}

/// Normalize a configured backend address: trim whitespace and trailing slashes.
pub fn normalize_address(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Validate a loaded configuration.
pub fn validate_config(config: &LbConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for raw in &config.backends {
        let address = normalize_address(raw);
        match Url::parse(&address) {
            Ok(url) if url.scheme() != "http" => {
                errors.push(ValidationError::UnsupportedScheme(address.clone()));
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidBackend {
                address: address.clone(),
                reason: e.to_string(),
            }),
        }
        if !seen.insert(address.clone()) {
            errors.push(ValidationError::DuplicateBackend(address));
        }
    }

    let health = &config.health_check;
    if health.interval_ms == 0 {
        errors.push(ValidationError::Zero("health_check.interval_ms"));
    }
    if health.timeout_ms == 0 {
        errors.push(ValidationError::Zero("health_check.timeout_ms"));
    }
    if health.interval_ms > 0 && health.timeout_ms >= health.interval_ms {
        errors.push(ValidationError::ProbeTimeoutTooLong {
            timeout_ms: health.timeout_ms,
            interval_ms: health.interval_ms,
        });
    }
    if !health.path.starts_with('/') {
        errors.push(ValidationError::InvalidProbePath(health.path.clone()));
    }

    if config.forwarding.timeout_ms == 0 {
        errors.push(ValidationError::Zero("forwarding.timeout_ms"));
    }
    if config.forwarding.timeout_ms > 0 && config.forwarding.timeout_ms <= health.timeout_ms {
        errors.push(ValidationError::ForwardTimeoutTooShort {
            forward_ms: config.forwarding.timeout_ms,
            probe_ms: health.timeout_ms,
        });
    }
    if config.forwarding.max_response_bytes == 0 {
        errors.push(ValidationError::Zero("forwarding.max_response_bytes"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track in-flight and total requests
//! - Track health state (healthy/unhealthy) and the last probe failure

use serde::Serialize;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// A single backend server.
///
/// The address is fixed at construction; the remaining fields are only
/// touched through the accessor methods below.
#[derive(Debug)]
pub struct Backend {
    /// Base address as configured, without a trailing slash.
    address: String,
    healthy: AtomicBool,
    active_connections: AtomicUsize,
    total_requests: AtomicU64,
    last_probe_error: Mutex<Option<String>>,
}

impl Backend {
    /// Create a new backend. Backends start healthy until the first probe says otherwise.
    pub fn new(address: &str) -> Result<Self, url::ParseError> {
        let address = address.trim().trim_end_matches('/').to_string();
        Url::parse(&address)?;
        Ok(Self {
            address,
            healthy: AtomicBool::new(true),
            active_connections: AtomicUsize::new(0),
            total_requests: AtomicU64::new(0),
            last_probe_error: Mutex::new(None),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Build the full target for a path (which must start with '/').
    pub fn target(&self, path_and_query: &str) -> String {
        format!("{}{}", self.address, path_and_query)
    }

    // --- Health ---

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Set the health flag, returning the previous value.
    pub fn set_healthy(&self, healthy: bool) -> bool {
        self.healthy.swap(healthy, Ordering::AcqRel)
    }

    pub fn last_probe_error(&self) -> Option<String> {
        self.last_probe_error
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn set_last_probe_error(&self, reason: Option<String>) {
        let mut slot = self
            .last_probe_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = reason;
    }

    // --- Load ---

    /// Get the current number of in-flight requests.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Acquire)
    }

    /// Record a dispatched request and return a guard that ends it on drop.
    pub fn begin_request(self: &Arc<Self>) -> RequestGuard {
        self.total_requests.fetch_add(1, Ordering::AcqRel);
        self.active_connections.fetch_add(1, Ordering::AcqRel);
        RequestGuard {
            backend: Arc::clone(self),
        }
    }

    /// Decrement the in-flight count. Saturates at zero.
    pub fn end_request(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Point-in-time view for logs and the stats snapshot.
    pub fn stats(&self) -> BackendStats {
        BackendStats {
            address: self.address.clone(),
            healthy: self.is_healthy(),
            active_connections: self.active_connections(),
            total_requests: self.total_requests(),
            last_probe_error: self.last_probe_error(),
        }
    }
}

/// Serializable snapshot of one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    pub address: String,
    pub healthy: bool,
    pub active_connections: usize,
    pub total_requests: u64,
    pub last_probe_error: Option<String>,
}

/// A RAII guard that holds one in-flight request slot on a backend.
///
/// Dropping it ends the request, so every exit path of the handler
/// (including cancellation) releases the slot exactly once.
#[derive(Debug)]
pub struct RequestGuard {
    backend: Arc<Backend>,
}

impl Deref for RequestGuard {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.backend.end_request();
    }
}

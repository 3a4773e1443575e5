//! Backend registry.
//!
//! # Responsibilities
//! - Own the fixed, ordered set of backends
//! - Provide healthy snapshots for selection
//! - Route health and load updates to the right backend

use std::collections::HashMap;
use std::sync::Arc;

use crate::load_balancer::backend::{Backend, BackendStats, RequestGuard};

/// Authoritative store of backend state.
///
/// The set and its order never change after construction. All mutable state
/// lives inside each `Backend`, so updates to unrelated backends never contend.
#[derive(Debug)]
pub struct BackendRegistry {
    backends: Vec<Arc<Backend>>,
    index: HashMap<String, usize>,
}

impl BackendRegistry {
    /// Create a registry from configured addresses, keeping their order.
    pub fn new<I, S>(addresses: I) -> Result<Self, url::ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut backends = Vec::new();
        let mut index = HashMap::new();

        for address in addresses {
            let backend = Backend::new(address.as_ref())?;
            if index.contains_key(backend.address()) {
                tracing::warn!(address = %backend.address(), "Duplicate backend ignored");
                continue;
            }
            index.insert(backend.address().to_string(), backends.len());
            backends.push(Arc::new(backend));
        }

        Ok(Self { backends, index })
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// All backends in base order.
    pub fn all(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn get(&self, address: &str) -> Option<&Arc<Backend>> {
        self.index.get(address).map(|&i| &self.backends[i])
    }

    /// Ordered snapshot of the backends currently marked healthy.
    ///
    /// A backend may flip state right after this returns; callers tolerate that.
    pub fn list_healthy(&self) -> Vec<Arc<Backend>> {
        self.backends
            .iter()
            .filter(|b| b.is_healthy())
            .cloned()
            .collect()
    }

    /// Set a backend's health flag. Returns the previous value, or `None`
    /// for an unknown address.
    pub fn set_health(&self, address: &str, healthy: bool) -> Option<bool> {
        self.get(address).map(|b| b.set_healthy(healthy))
    }

    /// Start a request on a backend: bumps active and total counters.
    pub fn begin_request(&self, address: &str) -> Option<RequestGuard> {
        self.get(address).map(Backend::begin_request)
    }

    /// End a request started without a guard (or after `std::mem::forget`).
    pub fn end_request(&self, address: &str) {
        if let Some(backend) = self.get(address) {
            backend.end_request();
        }
    }

    pub fn snapshot(&self) -> Vec<BackendStats> {
        self.backends.iter().map(|b| b.stats()).collect()
    }
}

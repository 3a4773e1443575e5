//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → pool.rs (snapshot of healthy backends, in configured order)
//!     → round_robin.rs (rotate through the healthy snapshot)
//!     → backend.rs (begin request, hand back a guard)
//!     → Guard dropped when forwarding completes
//! ```
//!
//! # Design Decisions
//! - The registry is the only shared mutable state; each backend owns its own atomics
//! - Unhealthy backends are excluded before the algorithm runs
//! - "No backend available" is a normal outcome (`None`), not an error

pub mod backend;
pub mod pool;
pub mod round_robin;

use std::fmt::Debug;
use std::sync::Arc;

use self::backend::Backend;
use self::pool::BackendRegistry;

pub use backend::{BackendStats, RequestGuard};
pub use round_robin::RoundRobin;

/// A backend selection strategy.
pub trait LoadBalancer: Send + Sync + Debug {
    /// Pick one backend out of an already-filtered healthy slice.
    fn next_server(&self, healthy: &[Arc<Backend>]) -> Option<Arc<Backend>>;

    /// Pick one healthy backend from the registry.
    fn select(&self, registry: &BackendRegistry) -> Option<Arc<Backend>> {
        self.next_server(&registry.list_healthy())
    }
}

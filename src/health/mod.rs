//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Startup, then every interval (active.rs):
//!     → GET {backend}/health for all backends, concurrently
//!     → status.rs decides alive / not alive
//!     → BackendRegistry::set_health
//! ```
//!
//! # Design Decisions
//! - One probe decides the state: no thresholds, no flap damping
//! - Probe failures are logged and recorded, never fatal
//! - The prober talks to request handling only through the registry

pub mod active;
pub mod status;

pub use active::HealthProber;
pub use status::{evaluate_body, ProbeFailure, ACCEPTED_STATUS_TOKENS};

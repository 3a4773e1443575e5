//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → BACKEND_URLS / LB_PORT environment (loader.rs)
//!     → command line overrides (main.rs via loader.rs)
//!     → validation.rs (semantic checks, all errors collected)
//!     → LbConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults so a bare `BACKEND_URLS` is enough to start
//! - A config without backends is a fatal startup error

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigOverrides};
pub use schema::{ForwardingConfig, HealthCheckConfig, LbConfig, ListenerConfig, ObservabilityConfig};
pub use validation::ValidationError;

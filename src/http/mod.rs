//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, outbound request copy)
//!     → proxy.rs (select backend, forward, map errors)
//!     → client.rs (pooled hyper client)
//!     → response.rs (relay backend response or canned JSON error)
//!     → Send to client
//! ```

pub mod client;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::{ErrorBody, FORWARDING_FAILED, NO_HEALTHY_BACKEND};
pub use server::{AppState, HttpServer, ServerError};

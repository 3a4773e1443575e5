//! Round-robin HTTP load balancer library.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::LbConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

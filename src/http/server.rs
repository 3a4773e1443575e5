//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the backend registry, selector and outbound client from config
//! - Create the Axum router: every method on every path goes to the proxy handler
//! - Wire up middleware (request ID, tracing, CORS)
//! - Run the health prober next to the server and stop both on shutdown

use axum::{routing::any, Router};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{LbConfig, ListenerConfig};
use crate::health::HealthProber;
use crate::http::client::{build_client, HttpClient};
use crate::http::proxy::proxy_handler;
use crate::http::request::UuidRequestId;
use crate::load_balancer::{pool::BackendRegistry, LoadBalancer, RoundRobin};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BackendRegistry>,
    pub selector: Arc<dyn LoadBalancer>,
    pub client: HttpClient,
    pub forward_timeout: Duration,
    pub max_response_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid backend address: {0}")]
    Backend(#[from] url::ParseError),

    #[error("no backends configured")]
    NoBackends,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: LbConfig,
    registry: Arc<BackendRegistry>,
    client: HttpClient,
}

impl HttpServer {
    /// Create a new HTTP server with the given (validated) configuration.
    pub fn new(config: LbConfig) -> Result<Self, ServerError> {
        let registry = Arc::new(BackendRegistry::new(&config.backends)?);
        if registry.is_empty() {
            return Err(ServerError::NoBackends);
        }

        let client = build_client(config.forwarding.connect_timeout());

        let state = AppState {
            registry: registry.clone(),
            selector: Arc::new(RoundRobin::new()),
            client: client.clone(),
            forward_timeout: config.forwarding.timeout(),
            max_response_bytes: config.forwarding.max_response_bytes,
        };

        let router = Self::build_router(&config.listener, state);
        Ok(Self {
            router,
            config,
            registry,
            client,
        })
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        let router = Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId));

        if config.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    pub fn registry(&self) -> Arc<BackendRegistry> {
        self.registry.clone()
    }

    /// Prober bound to this server's registry.
    pub fn health_prober(&self) -> HealthProber {
        HealthProber::new(
            self.registry.clone(),
            self.config.health_check.clone(),
            self.client.clone(),
        )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.registry.len(),
            "Load balancer listening"
        );
        for backend in self.registry.all() {
            tracing::info!(address = %backend.address(), "Backend registered");
        }

        let prober = self.health_prober().spawn(shutdown.resubscribe());

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        if let Err(e) = prober.await {
            tracing::error!(error = %e, "Health prober task failed");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

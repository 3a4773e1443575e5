//! Active health checking.
//!
//! # Responsibilities
//! - Probe every backend once at startup, then on a fixed interval
//! - Probe backends concurrently so one slow backend never delays another
//! - Write the outcome into the registry and record the failure reason

use axum::body::{self, Body};
use axum::http::{header, Request, Uri};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::status::{evaluate_body, ProbeFailure};
use crate::http::client::{error_chain, HttpClient};
use crate::load_balancer::backend::Backend;
use crate::load_balancer::pool::BackendRegistry;
use crate::observability::metrics;

/// Largest health response body we read.
const MAX_PROBE_BODY_BYTES: usize = 64 * 1024;

const USER_AGENT: &str = "lb-proxy-health-check";

/// Periodic prober that owns all writes to backend health flags.
pub struct HealthProber {
    registry: Arc<BackendRegistry>,
    config: HealthCheckConfig,
    client: HttpClient,
}

impl HealthProber {
    pub fn new(registry: Arc<BackendRegistry>, config: HealthCheckConfig, client: HttpClient) -> Self {
        Self {
            registry,
            config,
            client,
        }
    }

    /// Spawn `run` on the current runtime.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Probe immediately, then every interval, until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            path = %self.config.path,
            backends = self.registry.len(),
            "Health prober starting"
        );

        // The first tick completes immediately.
        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one probe cycle over every backend.
    pub async fn check_all(&self) {
        let probes = self.registry.all().iter().map(move |backend| async move {
            let outcome = self.probe(backend).await;
            self.apply(backend, outcome);
        });
        join_all(probes).await;

        tracing::debug!(
            healthy = self.registry.list_healthy().len(),
            total = self.registry.len(),
            "Health check cycle complete"
        );
    }

    /// Probe one backend without touching its state.
    pub async fn probe(&self, backend: &Backend) -> Result<(), ProbeFailure> {
        let target = backend.target(&self.config.path);
        let uri: Uri = target
            .parse()
            .map_err(|_| ProbeFailure::InvalidUri(target.clone()))?;

        let request = Request::get(uri)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .map_err(|_| ProbeFailure::InvalidUri(target.clone()))?;

        let timeout = self.config.timeout();
        match time::timeout(timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeFailure::Timeout(timeout)),
        }
    }

    async fn exchange(&self, request: Request<Body>) -> Result<(), ProbeFailure> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ProbeFailure::Transport(error_chain(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeFailure::Status(status.as_u16()));
        }

        let bytes = body::to_bytes(Body::new(response.into_body()), MAX_PROBE_BODY_BYTES)
            .await
            .map_err(|e| ProbeFailure::Body(e.to_string()))?;

        evaluate_body(&bytes)
    }

    fn apply(&self, backend: &Backend, outcome: Result<(), ProbeFailure>) {
        let address = backend.address();
        let healthy = outcome.is_ok();
        let previous = self.registry.set_health(address, healthy);

        match outcome {
            Ok(()) => {
                backend.set_last_probe_error(None);
                if previous == Some(false) {
                    tracing::info!(address = %address, "Backend is healthy again");
                }
            }
            Err(failure) => {
                tracing::warn!(address = %address, reason = %failure, "Health check failed");
                metrics::record_probe_failure(address, failure.kind());
                backend.set_last_probe_error(Some(failure.to_string()));
                if previous == Some(true) {
                    tracing::warn!(address = %address, "Backend marked unhealthy");
                }
            }
        }

        metrics::record_backend_health(address, healthy);
    }

    pub fn probe_timeout(&self) -> Duration {
        self.config.timeout()
    }
}

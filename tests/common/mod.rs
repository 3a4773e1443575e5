//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use lb_proxy::config::LbConfig;
use lb_proxy::load_balancer::pool::BackendRegistry;
use lb_proxy::{HttpServer, Shutdown};

/// Method and path+query of a request seen by a mock backend.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Seen {
    pub method: String,
    pub target: String,
}

/// Read the request head and answer with whatever `f` returns.
async fn handle<F, Fut>(mut socket: TcpStream, f: Arc<F>)
where
    F: Fn(Seen) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let seen = Seen {
        method: request_line.next().unwrap_or_default().to_string(),
        target: request_line.next().unwrap_or_default().to_string(),
    };

    let (status, body) = f(seen).await;
    let status_text = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(Seen) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(handle(socket, f.clone()));
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A backend whose `/health` reports `health_body` and whose other paths answer `name`.
#[allow(dead_code)]
pub async fn start_named_backend(name: &'static str, health_body: &'static str) -> SocketAddr {
    start_programmable_backend(move |seen| async move {
        if seen.target == "/health" {
            (200, health_body.to_string())
        } else {
            (200, format!(r#"{{"backend":"{name}"}}"#))
        }
    })
    .await
}

/// An address with nothing listening on it.
#[allow(dead_code)]
pub async fn refused_addr() -> SocketAddr {
    TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap()
}

/// Test configuration: fast probes, the given backends.
pub fn config_for(backends: &[SocketAddr]) -> LbConfig {
    let mut config = LbConfig::default();
    config.backends = backends.iter().map(|a| format!("http://{a}")).collect();
    config.health_check.interval_ms = 5_000;
    config.health_check.timeout_ms = 300;
    config.forwarding.timeout_ms = 2_000;
    config
}

/// A running load balancer.
#[allow(dead_code)]
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub registry: Arc<BackendRegistry>,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<()>,
}

/// Start the load balancer on an ephemeral port.
pub async fn start_proxy(config: LbConfig) -> RunningProxy {
    let server = HttpServer::new(config).unwrap();
    let registry = server.registry();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown: broadcast::Receiver<()> = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Let the initial probe cycle finish.
    tokio::time::sleep(Duration::from_millis(500)).await;

    RunningProxy {
        addr,
        registry,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

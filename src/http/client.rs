//! Outbound HTTP client shared by the prober and the proxy handler.

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::error::Error;
use std::time::Duration;

/// Pooled HTTP/1.1 client.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build a client with a bounded TCP connect time.
pub fn build_client(connect_timeout: Duration) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(connector)
}

/// Render an error with its `source()` chain, e.g.
/// "client error (Connect): tcp connect error: Connection refused".
pub fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

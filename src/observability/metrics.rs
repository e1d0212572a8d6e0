//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_rewrites_total` (counter): rewrites applied, by kind (`html`, `location`)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished proxy request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record one applied rewrite.
pub fn record_rewrite(kind: &'static str) {
    metrics::counter!("proxy_rewrites_total", "kind" => kind).increment(1);
}

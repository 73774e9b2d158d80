//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, tunnels, DNS cache, sessions)
//! - Expose a Prometheus-compatible metrics endpoint (optional)
//!
//! # Metrics
//! - `proxy_requests_total` (counter): completed requests by method, status
//! - `proxy_requests_aborted_total` (counter): dropped requests by method, reason
//! - `proxy_request_duration_seconds` (histogram): dispatch latency
//! - `proxy_tunnels_established_total` (counter): upgraded CONNECT tunnels
//! - `proxy_tunnel_bytes_total` (counter): relayed bytes by direction
//! - `proxy_active_sessions` (gauge): live tunnel sessions
//! - `proxy_dns_cache_lookups_total` (counter): cache lookups by result
//! - `proxy_dns_cache_entries` (gauge): current cache size
//! - `proxy_dns_resolutions_total` (counter): resolver calls by outcome

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::proxy::relay::RelaySummary;

/// Install the Prometheus exporter with an HTTP listener.
///
/// Failure is logged, not fatal; the proxy serves without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(err) => tracing::error!(error = %err, "Failed to install metrics exporter"),
    }
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a request dropped without a reply.
pub fn record_aborted(method: &str, reason: &'static str) {
    counter!(
        "proxy_requests_aborted_total",
        "method" => method.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_tunnel_established() {
    counter!("proxy_tunnels_established_total").increment(1);
}

pub fn record_tunnel_closed(summary: &RelaySummary) {
    counter!("proxy_tunnel_bytes_total", "direction" => "client_to_upstream")
        .increment(summary.client_to_upstream);
    counter!("proxy_tunnel_bytes_total", "direction" => "upstream_to_client")
        .increment(summary.upstream_to_client);
}

pub fn set_active_sessions(count: usize) {
    gauge!("proxy_active_sessions").set(count as f64);
}

pub fn record_dns_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("proxy_dns_cache_lookups_total", "result" => result).increment(1);
}

pub fn set_dns_cache_size(count: usize) {
    gauge!("proxy_dns_cache_entries").set(count as f64);
}

pub fn record_resolution(outcome: &'static str) {
    counter!("proxy_dns_resolutions_total", "outcome" => outcome).increment(1);
}

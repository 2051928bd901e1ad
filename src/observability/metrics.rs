//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (connections, cache effectiveness, failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_connections_total` (counter): accepted client connections
//! - `proxy_active_connections` (gauge): handlers currently running
//! - `proxy_cache_hits_total` / `proxy_cache_misses_total` (counter)
//! - `proxy_cache_evictions_total` (counter)
//! - `proxy_cache_bytes` (gauge): bytes resident in the cache
//! - `proxy_origin_errors_total` (counter): failed origin connects or reads
//! - `proxy_request_errors_total{kind}` (counter): rejected client requests
//! - `proxy_response_bytes_total{source}` (counter): bytes sent, `cache` or `origin`
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed, so tests never need one

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_opened() {
    ::metrics::counter!("proxy_connections_total").increment(1);
    ::metrics::gauge!("proxy_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    ::metrics::gauge!("proxy_active_connections").decrement(1.0);
}

pub fn record_cache_lookup(hit: bool) {
    if hit {
        ::metrics::counter!("proxy_cache_hits_total").increment(1);
    } else {
        ::metrics::counter!("proxy_cache_misses_total").increment(1);
    }
}

pub fn record_cache_evictions(count: u64) {
    if count > 0 {
        ::metrics::counter!("proxy_cache_evictions_total").increment(count);
    }
}

pub fn record_cache_bytes(bytes: usize) {
    ::metrics::gauge!("proxy_cache_bytes").set(bytes as f64);
}

pub fn record_origin_error() {
    ::metrics::counter!("proxy_origin_errors_total").increment(1);
}

pub fn record_request_error(kind: &'static str) {
    ::metrics::counter!("proxy_request_errors_total", "kind" => kind).increment(1);
}

pub fn record_response_bytes(source: &'static str, bytes: u64) {
    ::metrics::counter!("proxy_response_bytes_total", "source" => source).increment(bytes);
}

//! Prometheus metrics for monitoring portal health and performance.
//!
//! This module provides metrics collection and export via a dedicated
//! scrape listener. Metrics are exposed in Prometheus text format.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **WebSocket Metrics**: Active event-stream connections
//! - **Tournament Metrics**: Active tournaments, match results reported
//! - **Room Metrics**: Active rooms, games completed
//! - **Auth Metrics**: Login attempts

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

/// Record HTTP request.
///
/// Increments the total HTTP request counter with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

/// Set current active event-stream WebSocket connections count.
pub fn websocket_connections_active(count: usize) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment tournament match results reported counter.
pub fn match_results_total(game_type: &str) {
    metrics::counter!("match_results_total",
        "game_type" => game_type.to_string()
    )
    .increment(1);
}

/// Increment tournaments completed counter.
pub fn tournaments_completed_total() {
    metrics::counter!("tournaments_completed_total").increment(1);
}

/// Increment games completed counter.
pub fn games_completed_total(game_type: &str) {
    metrics::counter!("games_completed_total",
        "game_type" => game_type.to_string()
    )
    .increment(1);
}

/// Increment login attempts counter.
pub fn login_attempts_total(success: bool) {
    metrics::counter!("login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}

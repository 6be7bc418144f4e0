//! Metrics collection and exposition.
//!
//! # Metrics
//! - `healthlog_http_requests_total` (counter): requests by method, route, status
//! - `healthlog_http_request_duration_seconds` (histogram): latency by method, route
//! - `healthlog_entries_saved_total` (counter): persisted log entries
//! - `healthlog_auth_failures_total` (counter): rejected API tokens
//!
//! # Design Decisions
//! - Route label is the matched route template, never the raw path
//! - Prometheus exporter only runs when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::info;

/// Label used for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(address: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()?;
    info!(address = %address, "Metrics endpoint listening");
    Ok(())
}

/// Request counting and latency middleware.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "healthlog_http_requests_total",
        "method" => method.clone(),
        "path" => route.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "healthlog_http_request_duration_seconds",
        "method" => method,
        "path" => route
    )
    .record(start.elapsed().as_secs_f64());

    response
}

pub fn record_entries_saved(count: usize) {
    metrics::counter!("healthlog_entries_saved_total").increment(count as u64);
}

pub fn record_auth_failure() {
    metrics::counter!("healthlog_auth_failures_total").increment(1);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, path, status
//! - `http_request_duration_seconds` (histogram): latency by method, path
//! - `http_panics_total` (counter): handler panics caught by recovery
//! - `shutdown_hook_failures_total` (counter): hooks that failed during shutdown
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Path label is the matched route template, not the raw path

use std::time::Instant;

use axum::http::header;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::http::routes::Route;

pub const METRICS_PATH: &str = "/metrics";

/// Install the process-wide Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!(path = METRICS_PATH, "Prometheus recorder installed");
    Ok(handle)
}

/// `GET /metrics` rendering the exposition text from `handle`.
pub fn route(handle: PrometheusHandle) -> Route {
    Route::get(METRICS_PATH, move || {
        let handle = handle.clone();
        async move {
            (
                [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                handle.render(),
            )
                .into_response()
        }
    })
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_panic() {
    metrics::counter!("http_panics_total").increment(1);
}

pub fn record_hook_failure(hook: &str) {
    metrics::counter!("shutdown_hook_failures_total", "hook" => hook.to_string()).increment(1);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, route
//! - `proxy_request_duration_seconds` (histogram): latency by route
//! - `proxy_rate_limited_total` (counter): requests rejected by the limiter
//! - `proxy_auth_failures_total` (counter): 401/403 outcomes by reason
//! - `proxy_backend_errors_total` (counter): failed backend calls
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without a recorder they are no-ops
//! - The Prometheus recorder is process-global and installed at most once

use std::sync::OnceLock;
use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install (once) and return the Prometheus recorder handle.
///
/// Returns `None` if another recorder already owns the process.
pub fn init_metrics() -> Option<PrometheusHandle> {
    static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                tracing::info!("Prometheus recorder installed");
                Some(handle)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Prometheus recorder");
                None
            }
        })
        .clone()
}

/// Record a finished request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("proxy_rate_limited_total").increment(1);
}

pub fn record_auth_failure(reason: &'static str) {
    metrics::counter!("proxy_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_backend_error(route: &str) {
    metrics::counter!("proxy_backend_errors_total", "route" => route.to_string()).increment(1);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `response_headers_requests_total` (counter): requests seen by the middleware
//! - `response_headers_directives_total` (counter): directives processed,
//!   labelled by `tag`, `phase` and `outcome` (`applied` / `skipped`)
//! - `response_headers_request_duration_seconds` (histogram): downstream latency
//! - `response_headers_reloads_total` (counter): configuration reloads by `result`
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exporter runs on its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::headers::directive::{MergeTag, Phase};

/// Install the Prometheus recorder and start its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "response_headers_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "response_headers_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_directive(tag: MergeTag, phase: Phase, applied: bool) {
    let outcome = if applied { "applied" } else { "skipped" };
    counter!(
        "response_headers_directives_total",
        "tag" => tag.as_str(),
        "phase" => phase.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_reload(success: bool) {
    let result = if success { "ok" } else { "error" };
    counter!("response_headers_reloads_total", "result" => result).increment(1);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `redirect_requests_total` (counter): requests by route pattern and outcome
//! - `redirect_request_duration_seconds` (histogram): evaluation latency
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_request(route: &str, status: StatusCode, start: Instant) {
    let outcome = if status.is_redirection() { "redirect" } else { "rejected" };
    metrics::counter!(
        "redirect_requests_total",
        "route" => route.to_owned(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("redirect_request_duration_seconds", "route" => route.to_owned())
        .record(start.elapsed().as_secs_f64());
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chainsig_stage_total` (counter): pipeline stage invocations by stage, outcome
//! - `chainsig_stage_duration_seconds` (histogram): stage latency
//! - `chainsig_session_signed_in` (gauge): 1 while an account is signed in

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record the outcome and latency of one pipeline stage call.
pub fn record_stage(stage: &'static str, success: bool, started: Instant) {
    let outcome = if success { "ok" } else { "error" };
    counter!("chainsig_stage_total", "stage" => stage, "outcome" => outcome).increment(1);
    histogram!("chainsig_stage_duration_seconds", "stage" => stage)
        .record(started.elapsed().as_secs_f64());
}

/// Record the session state.
pub fn record_signed_in(signed_in: bool) {
    gauge!("chainsig_session_signed_in").set(if signed_in { 1.0 } else { 0.0 });
}

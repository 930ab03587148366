//! Metrics collection and exposition.
//!
//! # Metrics
//! - `deploy_update_attempts_total` (counter): attempts by trigger and outcome
//! - `deploy_update_duration_seconds` (histogram): time spent per attempt
//! - `deploy_notify_failures_total` (counter): failed applied-version notifications
//! - `deploy_applied_entities` (gauge): registry size by entity kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_update(trigger: &'static str, outcome: &'static str, started: Instant) {
    counter!("deploy_update_attempts_total", "trigger" => trigger, "outcome" => outcome).increment(1);
    histogram!("deploy_update_duration_seconds", "trigger" => trigger)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_notify_failure() {
    counter!("deploy_notify_failures_total").increment(1);
}

pub fn record_registry_size(kind: &'static str, size: usize) {
    gauge!("deploy_applied_entities", "kind" => kind).set(size as f64);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_hook_start_total` (counter): start attempts by hook, result
//! - `lifecycle_hook_stop_total` (counter): stop outcomes by hook, outcome
//! - `lifecycle_shutdown_duration_seconds` (histogram): full stop sequence
//! - `http_requests_in_flight` (gauge): requests being served, by service
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder (tests, `--check`) every call is a no-op
//! - The binary installs a Prometheus recorder and serves its handle from the
//!   metrics listener

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// A render handle backed by a recorder that is not installed globally.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

pub fn record_hook_start(hook: &str, succeeded: bool) {
    let result = if succeeded { "ok" } else { "error" };
    ::metrics::counter!(
        "lifecycle_hook_start_total",
        "hook" => hook.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_hook_stop(hook: &str, outcome: &'static str) {
    ::metrics::counter!(
        "lifecycle_hook_stop_total",
        "hook" => hook.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_shutdown_duration(elapsed: Duration) {
    ::metrics::histogram!("lifecycle_shutdown_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn increment_in_flight(service: &str) {
    ::metrics::gauge!("http_requests_in_flight", "service" => service.to_string()).increment(1.0);
}

pub fn decrement_in_flight(service: &str) {
    ::metrics::gauge!("http_requests_in_flight", "service" => service.to_string()).decrement(1.0);
}

//! Prometheus metrics (spec.md §6: `/metrics`, carried as an ambient
//! concern regardless of the spec's non-goals). No file in the teacher
//! repo implements this despite its `lib.rs` listing a `metrics` module
//! (the pack retrieval did not include it), so this is authored against
//! `metrics-exporter-prometheus`'s own recorder-handle API, following the
//! teacher's naming (`init_metrics`, `metrics_handler`, `record_request`)
//! rather than inventing new ones.

use axum::extract::State;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Installs the global recorder and returns a handle, to be stored on
/// `AppState` and rendered by [`metrics_handler`]. Call once at startup,
/// before any `metrics::counter!`/`metrics::histogram!` call site runs.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

pub fn record_request(route: &'static str, status: u16) {
    metrics::counter!("ollama_fleet_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
}

pub fn record_forward_latency(route: &'static str, seconds: f64) {
    metrics::histogram!("ollama_fleet_forward_latency_seconds", "route" => route).record(seconds);
}

pub fn record_upstream_failover(backend_index: usize) {
    metrics::counter!("ollama_fleet_upstream_failovers_total", "attempt" => backend_index.to_string())
        .increment(1);
}

pub fn record_probe_outcome(status: &'static str) {
    metrics::counter!("ollama_fleet_probe_outcomes_total", "status" => status).increment(1);
}

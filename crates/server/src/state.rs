//! Shared state across all handlers.
//!
//! Grounded on the teacher's `AppState` (`crates/server/src/state.rs`):
//! one `Clone`-cheap struct built once at startup and threaded through
//! `axum::extract::State`. This state has no hot-reload requirement (the
//! teacher's `Arc<RwLock<Settings>>`), so settings are a plain `Arc`; the
//! one mutable piece this proxy needs — a pool of `OllamaClient`s keyed
//! by backend URL, so the forwarder reuses connections across requests —
//! uses the same `parking_lot::RwLock` the teacher reaches for.

use std::collections::HashMap;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use ollama_fleet_client::OllamaClient;
use ollama_fleet_config::Settings;
use ollama_fleet_store::DbPool;
use parking_lot::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub settings: Arc<Settings>,
    pub metrics_handle: PrometheusHandle,
    clients: Arc<RwLock<HashMap<String, OllamaClient>>>,
}

impl AppState {
    pub fn new(pool: DbPool, settings: Settings, metrics_handle: PrometheusHandle) -> Self {
        Self {
            pool,
            settings: Arc::new(settings),
            metrics_handle,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the cached `OllamaClient` for `base_url`, building and
    /// caching one on first use. `OllamaClient::new` only fails on
    /// `reqwest::Client` construction (TLS/DNS resolver setup), which is
    /// an environment problem, not a per-request one.
    pub fn client_for(&self, base_url: &str) -> Result<OllamaClient, ollama_fleet_client::UpstreamError> {
        if let Some(client) = self.clients.read().get(base_url) {
            return Ok(client.clone());
        }
        let client = OllamaClient::new(base_url)?;
        self.clients
            .write()
            .insert(base_url.to_string(), client.clone());
        Ok(client)
    }
}

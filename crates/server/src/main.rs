//! Process entry point. Grounded on the teacher's `main.rs`
//! (`crates/server/src/main.rs`): load settings, init tracing, connect the
//! store, start the scheduler, build the router, serve with graceful
//! shutdown on SIGINT/SIGTERM.

mod auth;
mod error;
mod forwarder;
mod http;
mod metrics;
mod rate_limit;
mod routes;
mod state;

use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ollama_fleet_scheduler::ProbeConfig;

use crate::http::create_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ollama_fleet_config::load_settings()?;
    init_tracing(&settings.app.log_level);

    let pool = ollama_fleet_store::connect(&settings.database).await?;

    let metrics_handle = metrics::init_metrics();

    let probe_config = ProbeConfig {
        benchmark_prompt: ollama_fleet_config::constants::BENCHMARK_PROMPT.to_string(),
        fake_markers: settings.app.fake_markers.clone(),
    };
    let scheduler_handle = ollama_fleet_scheduler::start(
        pool.clone(),
        probe_config,
        settings.scheduler.max_concurrent_probes,
    )
    .await;

    let bind_addr = settings.app.bind_addr.clone();
    let state = AppState::new(pool, settings, metrics_handle);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler_handle.shutdown();
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}

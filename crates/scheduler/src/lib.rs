//! Schedules and runs endpoint probes.
//!
//! Translates the original's APScheduler-driven `SchedulerService`
//! (`backend/src/endpoint/scheduler.py`) into `tokio`'s native primitives:
//! a `tokio::time::interval` loop stands in for the cron job, a
//! `tokio::sync::Semaphore` for `asyncio.Semaphore`, and `tokio::spawn` per
//! task for `scheduler.add_job`. No extra scheduling crate earns its keep
//! here — `tokio` alone covers "run this again every N hours" once the
//! interval is reloaded from the database on every tick.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use ollama_fleet_config::constants::timeouts;
use ollama_fleet_core::SystemSettingKey;
use ollama_fleet_probe::{probe_endpoint, ProbeSettings};
use ollama_fleet_store::DbPool;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Fixed prompt + configurable fake-marker list every probe run uses.
#[derive(Clone)]
pub struct ProbeConfig {
    pub benchmark_prompt: String,
    pub fake_markers: Vec<String>,
}

pub struct SchedulerHandle {
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl SchedulerHandle {
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Starts the scheduler: clears any task left `pending`/`running` by a
/// prior process, then spawns the periodic-tick loop. Returns a handle the
/// caller can use to request a graceful stop.
pub async fn start(pool: DbPool, probe_config: ProbeConfig, max_concurrent_probes: usize) -> SchedulerHandle {
    let cleared = ollama_fleet_store::task::clear_interrupted(&pool)
        .await
        .unwrap_or_else(|e| {
            error!("failed to clear interrupted tasks at startup: {e}");
            0
        });
    if cleared > 0 {
        info!("cleared {cleared} interrupted endpoint test tasks");
    }

    let (tx, rx) = tokio::sync::watch::channel(false);
    let semaphore = Arc::new(Semaphore::new(max_concurrent_probes));

    tokio::spawn(periodic_tick_loop(pool, probe_config, semaphore, rx));

    SchedulerHandle { shutdown: tx }
}

async fn periodic_tick_loop(
    pool: DbPool,
    probe_config: ProbeConfig,
    semaphore: Arc<Semaphore>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    tokio::time::sleep(StdDuration::from_secs(timeouts::SCHEDULER_WARMUP_SECS)).await;

    loop {
        if *shutdown.borrow() {
            return;
        }

        let interval_hours = ollama_fleet_store::setting::update_endpoint_task_interval_hours(&pool)
            .await
            .unwrap_or_else(|e| {
                warn!("failed to read endpoint task interval setting, defaulting to 24h: {e}");
                24
            });

        if let Err(e) = schedule_all_endpoints(&pool, interval_hours).await {
            error!("periodic endpoint scheduling pass failed: {e}");
        }

        if let Err(e) = run_due_tasks(&pool, &probe_config, &semaphore).await {
            error!("running due endpoint test tasks failed: {e}");
        }

        let next_tick = StdDuration::from_secs((interval_hours.max(1) as u64) * 3600);
        tokio::select! {
            _ = tokio::time::sleep(next_tick) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

/// Batches every known endpoint in groups of
/// [`ollama_fleet_config::constants::limits::SCHEDULER_BATCH_SIZE`],
/// yielding between batches so this sweep never starves request handling.
async fn schedule_all_endpoints(pool: &DbPool, interval_hours: i64) -> ollama_fleet_store::StoreResult<()> {
    let ids = ollama_fleet_store::endpoint::list_all_ids(pool).await?;
    info!("scheduling periodic probes for {} endpoints", ids.len());

    let scheduled_at = Utc::now() + Duration::seconds(timeouts::PERIODIC_TASK_LEAD_SECS);
    let interval = Duration::hours(interval_hours.max(1));

    for batch in ids.chunks(ollama_fleet_config::constants::limits::SCHEDULER_BATCH_SIZE) {
        for endpoint_id in batch {
            if let Err(e) =
                ollama_fleet_store::task::upsert_periodic(pool, *endpoint_id, scheduled_at, interval).await
            {
                error!("failed to schedule endpoint {endpoint_id}: {e}");
            }
        }
        tokio::task::yield_now().await;
    }
    Ok(())
}

/// Schedules a probe for one endpoint outside the periodic sweep (e.g.
/// right after it is registered). Mirrors `schedule_endpoint_test`'s skip
/// rule: a task already `running` within the last ten minutes blocks a new
/// one from being queued.
pub async fn schedule_on_demand(pool: &DbPool, endpoint_id: i64) -> ollama_fleet_store::StoreResult<bool> {
    let scheduled_at = Utc::now() + Duration::seconds(5);
    let task = ollama_fleet_store::task::schedule_on_demand(pool, endpoint_id, scheduled_at).await?;
    Ok(task.is_some())
}

async fn run_due_tasks(
    pool: &DbPool,
    probe_config: &ProbeConfig,
    semaphore: &Arc<Semaphore>,
) -> ollama_fleet_store::StoreResult<()> {
    let due = ollama_fleet_store::task::list_due(pool, Utc::now()).await?;
    for task in due {
        let permit = semaphore.clone().acquire_owned().await;
        let pool = pool.clone();
        let probe_config = probe_config.clone();
        tokio::spawn(async move {
            let _permit = permit;
            run_one_task(&pool, task.id, task.endpoint_id, &probe_config).await;
        });
    }
    Ok(())
}

/// Runs a single task end to end: claim it, probe, apply, close it out.
/// Never leaves the task `running` — any failure along the way marks it
/// `failed` instead. There is no retry counter; the next periodic tick
/// re-schedules the endpoint.
async fn run_one_task(pool: &DbPool, task_id: i64, endpoint_id: i64, probe_config: &ProbeConfig) {
    match ollama_fleet_store::task::try_start(pool, task_id).await {
        Ok(true) => {}
        Ok(false) => return,
        Err(e) => {
            error!("failed to claim task {task_id}: {e}");
            return;
        }
    }

    info!("running endpoint test task {task_id} for endpoint {endpoint_id}");

    let result = run_probe_and_apply(pool, endpoint_id, probe_config).await;
    match result {
        Ok(()) => {
            if let Err(e) = ollama_fleet_store::task::mark_done(pool, task_id).await {
                error!("failed to mark task {task_id} done: {e}");
            }
        }
        Err(e) => {
            error!("task {task_id} for endpoint {endpoint_id} failed: {e}");
            if let Err(e) = ollama_fleet_store::task::mark_failed(pool, task_id).await {
                error!("failed to mark task {task_id} failed: {e}");
            }
        }
    }
}

async fn run_probe_and_apply(
    pool: &DbPool,
    endpoint_id: i64,
    probe_config: &ProbeConfig,
) -> ollama_fleet_store::StoreResult<()> {
    let endpoint = ollama_fleet_store::endpoint::get_by_id(pool, endpoint_id).await?;

    let settings = ProbeSettings {
        benchmark_prompt: &probe_config.benchmark_prompt,
        fake_markers: &probe_config.fake_markers,
    };
    let outcome = probe_endpoint(&endpoint.url, &settings).await;

    ollama_fleet_store::endpoint_ai_model::apply_probe_measurements(
        pool,
        endpoint_id,
        outcome.endpoint.status,
        outcome.endpoint.ollama_version.as_deref(),
        &outcome.models,
    )
    .await?;

    Ok(())
}

/// Reloads the interval setting with validation, for the admin-facing
/// "update scheduler interval" route to call before persisting.
pub fn validate_interval_hours(value: &str) -> Result<(), ollama_fleet_core::DomainError> {
    ollama_fleet_core::SystemSetting::validate_value(
        SystemSettingKey::UpdateEndpointTaskIntervalHours,
        value,
    )
}

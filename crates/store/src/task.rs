use chrono::{DateTime, Duration, Utc};
use ollama_fleet_core::EndpointTestTask;
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};
use crate::pool::DbPool;

#[derive(FromRow)]
struct TaskRow {
    id: i64,
    endpoint_id: i64,
    status: String,
    scheduled_at: DateTime<Utc>,
    last_tried: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for EndpointTestTask {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(EndpointTestTask {
            id: row.id,
            endpoint_id: row.endpoint_id,
            status: row.status.parse()?,
            scheduled_at: row.scheduled_at,
            last_tried: row.last_tried,
            created_at: row.created_at,
        })
    }
}

pub async fn get_by_id(pool: &DbPool, task_id: i64) -> StoreResult<EndpointTestTask> {
    let row: TaskRow = sqlx::query_as("SELECT * FROM endpoint_test_tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))?;
    row.try_into()
}

/// Most recently scheduled task for an endpoint, for `GET /endpoint/{id}/task`.
pub async fn latest_for_endpoint(
    pool: &DbPool,
    endpoint_id: i64,
) -> StoreResult<EndpointTestTask> {
    let row: TaskRow = sqlx::query_as(
        "SELECT * FROM endpoint_test_tasks WHERE endpoint_id = $1 \
         ORDER BY scheduled_at DESC LIMIT 1",
    )
    .bind(endpoint_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("no task for endpoint {endpoint_id}")))?;
    row.try_into()
}

/// Called once at scheduler startup. There is no task resume: any task left
/// `pending`/`running` from a prior process belongs to a run that is gone,
/// and the next periodic tick will naturally re-schedule the endpoint.
pub async fn clear_interrupted(pool: &DbPool) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM endpoint_test_tasks WHERE status IN ('pending', 'running')")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Inserts a `pending` task, or bumps an already-`pending` future task for
/// the same endpoint to `scheduled_at`, whichever the periodic sweep needs.
/// Skips entirely if a `done`/`running` task already covers this endpoint
/// within the last `interval`. Returns `None` when skipped.
pub async fn upsert_periodic(
    pool: &DbPool,
    endpoint_id: i64,
    scheduled_at: DateTime<Utc>,
    interval: Duration,
) -> StoreResult<Option<EndpointTestTask>> {
    let (recent,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM endpoint_test_tasks
        WHERE endpoint_id = $1
          AND status IN ('done', 'running')
          AND scheduled_at >= $2
        "#,
    )
    .bind(endpoint_id)
    .bind(scheduled_at - interval)
    .fetch_one(pool)
    .await?;
    if recent > 0 {
        return Ok(None);
    }

    let existing: Option<TaskRow> = sqlx::query_as(
        r#"
        SELECT * FROM endpoint_test_tasks
        WHERE endpoint_id = $1 AND status = 'pending' AND scheduled_at >= $2
        ORDER BY scheduled_at ASC
        LIMIT 1
        "#,
    )
    .bind(endpoint_id)
    .bind(scheduled_at)
    .fetch_optional(pool)
    .await?;

    let row: TaskRow = if let Some(existing) = existing {
        sqlx::query_as("UPDATE endpoint_test_tasks SET scheduled_at = $2 WHERE id = $1 RETURNING *")
            .bind(existing.id)
            .bind(scheduled_at)
            .fetch_one(pool)
            .await?
    } else {
        sqlx::query_as(
            r#"
            INSERT INTO endpoint_test_tasks (endpoint_id, status, scheduled_at)
            VALUES ($1, 'pending', $2)
            RETURNING *
            "#,
        )
        .bind(endpoint_id)
        .bind(scheduled_at)
        .fetch_one(pool)
        .await?
    };
    Ok(Some(row.try_into()?))
}

/// On-demand scheduling for a single endpoint (e.g. right after it's
/// registered). Skips if a `running` task started within the last ten
/// minutes, otherwise behaves like [`upsert_periodic`] with a zero lookback
/// window (any `done`/`running` task blocks a fresh schedule at all).
pub async fn schedule_on_demand(
    pool: &DbPool,
    endpoint_id: i64,
    scheduled_at: DateTime<Utc>,
) -> StoreResult<Option<EndpointTestTask>> {
    let (running_recent,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM endpoint_test_tasks
        WHERE endpoint_id = $1 AND status = 'running' AND scheduled_at >= $2
        "#,
    )
    .bind(endpoint_id)
    .bind(scheduled_at - Duration::minutes(10))
    .fetch_one(pool)
    .await?;
    if running_recent > 0 {
        return Ok(None);
    }

    let existing: Option<TaskRow> = sqlx::query_as(
        r#"
        SELECT * FROM endpoint_test_tasks
        WHERE endpoint_id = $1 AND status = 'pending' AND scheduled_at >= $2
        ORDER BY scheduled_at ASC
        LIMIT 1
        "#,
    )
    .bind(endpoint_id)
    .bind(scheduled_at)
    .fetch_optional(pool)
    .await?;

    let row: TaskRow = if let Some(existing) = existing {
        sqlx::query_as("UPDATE endpoint_test_tasks SET scheduled_at = $2 WHERE id = $1 RETURNING *")
            .bind(existing.id)
            .bind(scheduled_at)
            .fetch_one(pool)
            .await?
    } else {
        sqlx::query_as(
            r#"
            INSERT INTO endpoint_test_tasks (endpoint_id, status, scheduled_at)
            VALUES ($1, 'pending', $2)
            RETURNING *
            "#,
        )
        .bind(endpoint_id)
        .bind(scheduled_at)
        .fetch_one(pool)
        .await?
    };
    Ok(Some(row.try_into()?))
}

/// Due tasks (`scheduled_at <= now`) still `pending`, for the tick to pick up.
pub async fn list_due(pool: &DbPool, now: DateTime<Utc>) -> StoreResult<Vec<EndpointTestTask>> {
    let rows: Vec<TaskRow> = sqlx::query_as(
        "SELECT * FROM endpoint_test_tasks WHERE status = 'pending' AND scheduled_at <= $1 ORDER BY scheduled_at ASC",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(EndpointTestTask::try_from).collect()
}

/// Marks the task `running` and stamps `last_tried`, but only if it is
/// still `pending` — guards against a task already claimed by a concurrent
/// tick. Returns `false` if the transition didn't apply.
pub async fn try_start(pool: &DbPool, task_id: i64) -> StoreResult<bool> {
    let result = sqlx::query(
        "UPDATE endpoint_test_tasks SET status = 'running', last_tried = now() \
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(task_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_done(pool: &DbPool, task_id: i64) -> StoreResult<()> {
    sqlx::query("UPDATE endpoint_test_tasks SET status = 'done' WHERE id = $1")
        .bind(task_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_failed(pool: &DbPool, task_id: i64) -> StoreResult<()> {
    sqlx::query("UPDATE endpoint_test_tasks SET status = 'failed' WHERE id = $1")
        .bind(task_id)
        .execute(pool)
        .await?;
    Ok(())
}

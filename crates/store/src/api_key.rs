use chrono::{DateTime, Duration, Utc};
use ollama_fleet_core::{ApiKey, ApiKeyUsageLog};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::pool::DbPool;

#[derive(FromRow)]
struct ApiKeyRow {
    id: i64,
    key: String,
    name: String,
    user_id: i64,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
    revoked: bool,
}

impl From<ApiKeyRow> for ApiKey {
    fn from(row: ApiKeyRow) -> Self {
        ApiKey {
            id: row.id,
            key: row.key,
            name: row.name,
            user_id: row.user_id,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
            revoked: row.revoked,
        }
    }
}

/// A fresh, unguessable key value. UUIDv4 matches the original's
/// `generate_api_key`; the header-based auth façade has no reason to use a
/// structured token format (no embedded expiry, no signature) since every
/// request round-trips to the store to validate it anyway.
pub fn generate_key() -> String {
    Uuid::new_v4().to_string()
}

pub async fn create(pool: &DbPool, user_id: i64, name: &str) -> StoreResult<ApiKey> {
    let key = generate_key();
    let row: ApiKeyRow = sqlx::query_as(
        r#"
        INSERT INTO api_keys (key, name, user_id)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&key)
    .bind(name)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn get_by_id(pool: &DbPool, api_key_id: i64) -> StoreResult<ApiKey> {
    let row: ApiKeyRow = sqlx::query_as("SELECT * FROM api_keys WHERE id = $1")
        .bind(api_key_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("api key {api_key_id}")))?;
    Ok(row.into())
}

/// Looks up a live (non-revoked) key by its value, the hot path the
/// forwarder runs on every proxied request.
pub async fn get_by_key(pool: &DbPool, key: &str) -> StoreResult<ApiKey> {
    let row: ApiKeyRow = sqlx::query_as("SELECT * FROM api_keys WHERE key = $1 AND revoked = FALSE")
        .bind(key)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("invalid api key".to_string()))?;
    Ok(row.into())
}

pub async fn touch_last_used(pool: &DbPool, api_key_id: i64) -> StoreResult<()> {
    sqlx::query("UPDATE api_keys SET last_used_at = now() WHERE id = $1")
        .bind(api_key_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn revoke(pool: &DbPool, api_key_id: i64) -> StoreResult<()> {
    let result = sqlx::query("UPDATE api_keys SET revoked = TRUE WHERE id = $1")
        .bind(api_key_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("api key {api_key_id}")));
    }
    Ok(())
}

pub async fn list_for_user(pool: &DbPool, user_id: i64) -> StoreResult<Vec<ApiKey>> {
    let rows: Vec<ApiKeyRow> = sqlx::query_as(
        "SELECT * FROM api_keys WHERE user_id = $1 AND revoked = FALSE ORDER BY id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(ApiKey::from).collect())
}

pub async fn list_all(pool: &DbPool) -> StoreResult<Vec<ApiKey>> {
    let rows: Vec<ApiKeyRow> = sqlx::query_as("SELECT * FROM api_keys WHERE revoked = FALSE ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(ApiKey::from).collect())
}

/// Appends one usage record. Written exactly once per proxied request,
/// regardless of whether the backend ultimately succeeded.
pub async fn log_usage(
    pool: &DbPool,
    api_key_id: i64,
    endpoint: &str,
    method: &str,
    model: Option<&str>,
    status_code: i32,
) -> StoreResult<ApiKeyUsageLog> {
    #[derive(FromRow)]
    struct UsageRow {
        id: i64,
        api_key_id: i64,
        timestamp: DateTime<Utc>,
        endpoint: String,
        method: String,
        model: Option<String>,
        status_code: i32,
    }

    let row: UsageRow = sqlx::query_as(
        r#"
        INSERT INTO api_key_usage_logs (api_key_id, endpoint, method, model, status_code)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(api_key_id)
    .bind(endpoint)
    .bind(method)
    .bind(model)
    .bind(status_code)
    .fetch_one(pool)
    .await?;

    Ok(ApiKeyUsageLog {
        id: row.id,
        api_key_id: row.api_key_id,
        timestamp: row.timestamp,
        endpoint: row.endpoint,
        method: row.method,
        model: row.model,
        status_code: row.status_code,
    })
}

/// Requests logged for `api_key_id` since `since` (inclusive), used by the
/// rate limiter for both the RPM (rolling one minute) and RPD (since UTC
/// midnight) windows — the caller picks `since`, this just counts.
pub async fn count_usage_since(
    pool: &DbPool,
    api_key_id: i64,
    since: DateTime<Utc>,
) -> StoreResult<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM api_key_usage_logs WHERE api_key_id = $1 AND timestamp >= $2",
    )
    .bind(api_key_id)
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub struct UsageStats {
    pub total_requests: i64,
    pub last_30_days_requests: i64,
    pub requests_today: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub requests_per_day: Vec<(chrono::NaiveDate, i64)>,
}

pub async fn usage_stats(pool: &DbPool, api_key_id: i64) -> StoreResult<UsageStats> {
    let now = Utc::now();
    let today_start = now.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
    let thirty_days_ago = now - Duration::days(30);

    let (total_requests,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM api_key_usage_logs WHERE api_key_id = $1")
            .bind(api_key_id)
            .fetch_one(pool)
            .await?;
    let last_30_days_requests = count_usage_since(pool, api_key_id, thirty_days_ago).await?;
    let requests_today = count_usage_since(pool, api_key_id, today_start).await?;
    let (successful_requests,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM api_key_usage_logs WHERE api_key_id = $1 AND status_code < 400",
    )
    .bind(api_key_id)
    .fetch_one(pool)
    .await?;
    let (failed_requests,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM api_key_usage_logs WHERE api_key_id = $1 AND status_code >= 400",
    )
    .bind(api_key_id)
    .fetch_one(pool)
    .await?;

    let daily_rows: Vec<(DateTime<Utc>, i64)> = sqlx::query_as(
        r#"
        SELECT date_trunc('day', timestamp) AS day, COUNT(*)
        FROM api_key_usage_logs
        WHERE api_key_id = $1 AND timestamp >= $2
        GROUP BY day
        ORDER BY day DESC
        "#,
    )
    .bind(api_key_id)
    .bind(thirty_days_ago)
    .fetch_all(pool)
    .await?;
    let requests_per_day = daily_rows
        .into_iter()
        .map(|(day, count)| (day.date_naive(), count))
        .collect();

    Ok(UsageStats {
        total_requests,
        last_30_days_requests,
        requests_today,
        successful_requests,
        failed_requests,
        requests_per_day,
    })
}

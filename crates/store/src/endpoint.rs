use chrono::{DateTime, Utc};
use ollama_fleet_core::{Endpoint, EndpointPerformance, EndpointStatus, Page, PageParams};
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};
use crate::pool::DbPool;

#[derive(FromRow)]
struct EndpointRow {
    id: i64,
    url: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<EndpointRow> for Endpoint {
    fn from(row: EndpointRow) -> Self {
        Endpoint {
            id: row.id,
            url: row.url,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Allow-list of columns a caller may sort listings by. `order_by` arrives
/// as a free-text query param; without this, interpolating it into SQL
/// would be an injection vector.
fn sort_column(order_by: Option<&str>) -> &'static str {
    match order_by {
        Some("name") => "name",
        Some("url") => "url",
        _ => "created_at",
    }
}

/// Creates the endpoint if its URL is new; otherwise returns the existing
/// row untouched. Mirrors spec.md §8's idempotence property: `POST
/// /endpoint` with a URL that already exists must not create a duplicate.
pub async fn create_or_get(pool: &DbPool, url: &str, name: &str) -> StoreResult<(Endpoint, bool)> {
    if let Some(existing) = get_by_url(pool, url).await.ok() {
        return Ok((existing, false));
    }
    let row: EndpointRow = sqlx::query_as(
        r#"
        INSERT INTO endpoints (url, name)
        VALUES ($1, $2)
        ON CONFLICT (url) DO UPDATE SET url = EXCLUDED.url
        RETURNING *
        "#,
    )
    .bind(url)
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok((row.into(), true))
}

/// Batch variant of [`create_or_get`]; returns every endpoint id (existing
/// and newly-created) so the caller can schedule a probe for each, per
/// spec.md §6's `/endpoint/batch`.
pub async fn batch_create_or_get(
    pool: &DbPool,
    entries: &[(String, String)],
) -> StoreResult<Vec<(Endpoint, bool)>> {
    let mut out = Vec::with_capacity(entries.len());
    for (url, name) in entries {
        out.push(create_or_get(pool, url, name).await?);
    }
    Ok(out)
}

pub async fn get_by_id(pool: &DbPool, endpoint_id: i64) -> StoreResult<Endpoint> {
    let row: EndpointRow = sqlx::query_as("SELECT * FROM endpoints WHERE id = $1")
        .bind(endpoint_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("endpoint {endpoint_id}")))?;
    Ok(row.into())
}

pub async fn get_by_url(pool: &DbPool, url: &str) -> StoreResult<Endpoint> {
    let row: EndpointRow = sqlx::query_as("SELECT * FROM endpoints WHERE url = $1")
        .bind(url)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("endpoint with url {url}")))?;
    Ok(row.into())
}

pub async fn rename(pool: &DbPool, endpoint_id: i64, name: &str) -> StoreResult<Endpoint> {
    let row: EndpointRow = sqlx::query_as("UPDATE endpoints SET name = $2 WHERE id = $1 RETURNING *")
        .bind(endpoint_id)
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("endpoint {endpoint_id}")))?;
    Ok(row.into())
}

/// Deletes the endpoint. Cascades to `endpoint_performances`,
/// `endpoint_ai_models`, and `ai_model_performances` rows via FK
/// `ON DELETE CASCADE` (spec.md §3/§9); `ai_models` rows are untouched.
pub async fn delete(pool: &DbPool, endpoint_id: i64) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM endpoints WHERE id = $1")
        .bind(endpoint_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("endpoint {endpoint_id}")));
    }
    Ok(())
}

pub async fn list_all_ids(pool: &DbPool) -> StoreResult<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM endpoints ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn list(pool: &DbPool, params: &PageParams) -> StoreResult<Page<Endpoint>> {
    let normalized = params.normalized();
    let order_column = sort_column(normalized.order_by.as_deref());
    let order_dir = normalized.order.as_sql();
    let search_pattern = normalized.search.as_ref().map(|s| format!("%{s}%"));

    let sql = format!(
        "SELECT * FROM endpoints WHERE ($1::text IS NULL OR name ILIKE $1 OR url ILIKE $1) \
         ORDER BY {order_column} {order_dir} LIMIT $2 OFFSET $3"
    );
    let rows: Vec<EndpointRow> = sqlx::query_as(&sql)
        .bind(&search_pattern)
        .bind(normalized.limit())
        .bind(normalized.offset())
        .fetch_all(pool)
        .await?;

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM endpoints WHERE ($1::text IS NULL OR name ILIKE $1 OR url ILIKE $1)",
    )
    .bind(&search_pattern)
    .fetch_one(pool)
    .await?;

    let items = rows.into_iter().map(Endpoint::from).collect();
    Ok(Page::new(items, total, params))
}

/// Endpoint id + how many AI models it currently links, for the listing
/// route's "linked model count" column (spec.md §6).
pub async fn model_count(pool: &DbPool, endpoint_id: i64) -> StoreResult<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM endpoint_ai_models WHERE endpoint_id = $1")
            .bind(endpoint_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

#[derive(FromRow)]
struct EndpointPerformanceRow {
    id: i64,
    endpoint_id: i64,
    status: String,
    ollama_version: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EndpointPerformanceRow> for EndpointPerformance {
    type Error = StoreError;

    fn try_from(row: EndpointPerformanceRow) -> Result<Self, Self::Error> {
        Ok(EndpointPerformance {
            id: row.id,
            endpoint_id: row.endpoint_id,
            status: row.status.parse()?,
            ollama_version: row.ollama_version,
            created_at: row.created_at,
        })
    }
}

/// Appends one liveness snapshot. Never updates a prior row; `Endpoint`
/// itself carries no status column, so "current status" is always the
/// latest row here (see [`latest_status`]).
pub async fn record_performance(
    executor: impl sqlx::PgExecutor<'_>,
    endpoint_id: i64,
    status: EndpointStatus,
    ollama_version: Option<&str>,
) -> StoreResult<EndpointPerformance> {
    let row: EndpointPerformanceRow = sqlx::query_as(
        r#"
        INSERT INTO endpoint_performances (endpoint_id, status, ollama_version)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(endpoint_id)
    .bind(status.as_str())
    .bind(ollama_version)
    .fetch_one(executor)
    .await?;
    row.try_into()
}

pub async fn latest_status(pool: &DbPool, endpoint_id: i64) -> StoreResult<Option<EndpointStatus>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT status FROM endpoint_performances WHERE endpoint_id = $1 \
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(endpoint_id)
    .fetch_optional(pool)
    .await?;
    match row {
        Some((status,)) => Ok(Some(status.parse()?)),
        None => Ok(None),
    }
}

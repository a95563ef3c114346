use chrono::{DateTime, Utc};
use ollama_fleet_core::AiModel;
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};
use crate::pool::DbPool;

#[derive(FromRow)]
struct AiModelRow {
    id: i64,
    name: String,
    tag: String,
    created_at: DateTime<Utc>,
}

impl From<AiModelRow> for AiModel {
    fn from(row: AiModelRow) -> Self {
        AiModel {
            id: row.id,
            name: row.name,
            tag: row.tag,
            created_at: row.created_at,
        }
    }
}

pub async fn get_by_name_tag(pool: &DbPool, name: &str, tag: &str) -> StoreResult<AiModel> {
    let row: AiModelRow = sqlx::query_as("SELECT * FROM ai_models WHERE name = $1 AND tag = $2")
        .bind(name)
        .bind(tag)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("ai model {name}:{tag}")))?;
    Ok(row.into())
}

pub async fn get_by_id(pool: &DbPool, model_id: i64) -> StoreResult<AiModel> {
    let row: AiModelRow = sqlx::query_as("SELECT * FROM ai_models WHERE id = $1")
        .bind(model_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("ai model {model_id}")))?;
    Ok(row.into())
}

/// Returns the model, inserting a vocabulary row if `name:tag` has never
/// been seen before. Models are never deleted by a probe; a vanished
/// model is marked `missing` on its `endpoint_ai_models` link instead.
pub async fn get_or_create(pool: &DbPool, name: &str, tag: &str) -> StoreResult<AiModel> {
    if let Ok(existing) = get_by_name_tag(pool, name, tag).await {
        return Ok(existing);
    }
    let row: AiModelRow = sqlx::query_as(
        r#"
        INSERT INTO ai_models (name, tag)
        VALUES ($1, $2)
        ON CONFLICT (name, tag) DO UPDATE SET name = EXCLUDED.name
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(tag)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn list(pool: &DbPool) -> StoreResult<Vec<AiModel>> {
    let rows: Vec<AiModelRow> = sqlx::query_as("SELECT * FROM ai_models ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(AiModel::from).collect())
}

/// Paginated listing with search-by-name/tag, for `GET /ai_model`.
pub async fn list_page(
    pool: &DbPool,
    params: &ollama_fleet_core::PageParams,
) -> StoreResult<ollama_fleet_core::Page<AiModel>> {
    let normalized = params.normalized();
    let search_pattern = normalized.search.as_ref().map(|s| format!("%{s}%"));

    let rows: Vec<AiModelRow> = sqlx::query_as(
        "SELECT * FROM ai_models WHERE ($1::text IS NULL OR name ILIKE $1 OR tag ILIKE $1) \
         ORDER BY name ASC, tag ASC LIMIT $2 OFFSET $3",
    )
    .bind(&search_pattern)
    .bind(normalized.limit())
    .bind(normalized.offset())
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM ai_models WHERE ($1::text IS NULL OR name ILIKE $1 OR tag ILIKE $1)",
    )
    .bind(&search_pattern)
    .fetch_one(pool)
    .await?;

    let items = rows.into_iter().map(AiModel::from).collect();
    Ok(ollama_fleet_core::Page::new(items, total, params))
}

/// How many endpoints currently link this model with a non-missing status.
pub async fn endpoint_count(pool: &DbPool, model_id: i64) -> StoreResult<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM endpoint_ai_models WHERE ai_model_id = $1 AND status != 'missing'",
    )
    .bind(model_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// How many endpoints currently serve this model and are actually
/// `available` — what the `api/tags`/`v1/models` shortcuts gate on
/// (spec.md §4.7 step 4), unlike [`endpoint_count`]'s broader
/// admin-listing notion of "still linked at all".
pub async fn available_endpoint_count(pool: &DbPool, model_id: i64) -> StoreResult<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM endpoint_ai_models WHERE ai_model_id = $1 AND status = 'available'",
    )
    .bind(model_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

use chrono::{DateTime, Utc};
use ollama_fleet_core::Plan;
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};
use crate::pool::DbPool;

#[derive(FromRow)]
struct PlanRow {
    id: i64,
    name: String,
    description: String,
    rpm: i32,
    rpd: i32,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Plan {
            id: row.id,
            name: row.name,
            description: row.description,
            rpm: row.rpm,
            rpd: row.rpd,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Creates a plan. When `is_default` is set, clears the previous default
/// in the same transaction so the "exactly one default plan" invariant
/// (spec.md §3/§8) never lapses even momentarily.
pub async fn create(
    pool: &DbPool,
    name: &str,
    description: &str,
    rpm: i32,
    rpd: i32,
    is_default: bool,
) -> StoreResult<Plan> {
    let mut tx = pool.begin().await?;
    if is_default {
        sqlx::query("UPDATE plans SET is_default = FALSE WHERE is_default = TRUE")
            .execute(&mut *tx)
            .await?;
    }
    let row: PlanRow = sqlx::query_as(
        r#"
        INSERT INTO plans (name, description, rpm, rpd, is_default)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(rpm)
    .bind(rpd)
    .bind(is_default)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(row.into())
}

/// The invariant "exactly one default plan" (spec.md §3/§8) is enforced by
/// a partial unique index on `is_default`; setting a new default must
/// clear the old one first, in the same transaction.
pub async fn set_default(pool: &DbPool, plan_id: i64) -> StoreResult<Plan> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE plans SET is_default = FALSE WHERE is_default = TRUE")
        .execute(&mut *tx)
        .await?;
    let row: PlanRow = sqlx::query_as(
        "UPDATE plans SET is_default = TRUE, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(plan_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("plan {plan_id}")))?;
    tx.commit().await?;
    Ok(row.into())
}

pub async fn get_by_id(pool: &DbPool, plan_id: i64) -> StoreResult<Plan> {
    let row: PlanRow = sqlx::query_as("SELECT * FROM plans WHERE id = $1")
        .bind(plan_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("plan {plan_id}")))?;
    Ok(row.into())
}

pub async fn get_default(pool: &DbPool) -> StoreResult<Plan> {
    let row: PlanRow = sqlx::query_as("SELECT * FROM plans WHERE is_default = TRUE LIMIT 1")
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("no default plan configured".to_string()))?;
    Ok(row.into())
}

pub async fn list(pool: &DbPool) -> StoreResult<Vec<Plan>> {
    let rows: Vec<PlanRow> = sqlx::query_as("SELECT * FROM plans ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Plan::from).collect())
}

/// Paginated listing with search-by-name/description, for `GET /plan`.
pub async fn list_page(
    pool: &DbPool,
    params: &ollama_fleet_core::PageParams,
) -> StoreResult<ollama_fleet_core::Page<Plan>> {
    let normalized = params.normalized();
    let search_pattern = normalized.search.as_ref().map(|s| format!("%{s}%"));

    let rows: Vec<PlanRow> = sqlx::query_as(
        "SELECT * FROM plans WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1) \
         ORDER BY id ASC LIMIT $2 OFFSET $3",
    )
    .bind(&search_pattern)
    .bind(normalized.limit())
    .bind(normalized.offset())
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM plans WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)",
    )
    .bind(&search_pattern)
    .fetch_one(pool)
    .await?;

    let items = rows.into_iter().map(Plan::from).collect();
    Ok(ollama_fleet_core::Page::new(items, total, params))
}

/// Updates the given fields; when `is_default = Some(true)`, clears any
/// other default plan in the same transaction, same as [`create`].
#[allow(clippy::too_many_arguments)]
pub async fn update(
    pool: &DbPool,
    plan_id: i64,
    name: Option<&str>,
    description: Option<&str>,
    rpm: Option<i32>,
    rpd: Option<i32>,
    is_default: Option<bool>,
) -> StoreResult<Plan> {
    let mut tx = pool.begin().await?;
    if is_default == Some(true) {
        sqlx::query("UPDATE plans SET is_default = FALSE WHERE is_default = TRUE AND id != $1")
            .bind(plan_id)
            .execute(&mut *tx)
            .await?;
    }
    let row: PlanRow = sqlx::query_as(
        r#"
        UPDATE plans
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            rpm = COALESCE($4, rpm),
            rpd = COALESCE($5, rpd),
            is_default = COALESCE($6, is_default),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(plan_id)
    .bind(name)
    .bind(description)
    .bind(rpm)
    .bind(rpd)
    .bind(is_default)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("plan {plan_id}")))?;
    tx.commit().await?;
    Ok(row.into())
}

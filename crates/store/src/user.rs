use chrono::{DateTime, Utc};
use ollama_fleet_core::User;
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};
use crate::pool::DbPool;

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    is_admin: bool,
    plan_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            is_admin: row.is_admin,
            plan_id: row.plan_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn count(pool: &DbPool) -> StoreResult<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Creates a user. The caller (the auth façade's `init` handler) is
/// responsible for forcing `is_admin = true` when this is the first user,
/// per spec.md §3's User invariant.
pub async fn create(
    pool: &DbPool,
    username: &str,
    password_hash: &str,
    is_admin: bool,
    plan_id: i64,
) -> StoreResult<User> {
    let row: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users (username, password_hash, is_admin, plan_id)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(is_admin)
    .bind(plan_id)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn get_by_id(pool: &DbPool, user_id: i64) -> StoreResult<User> {
    let row: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
    Ok(row.into())
}

pub async fn get_by_username(pool: &DbPool, username: &str) -> StoreResult<User> {
    let row: UserRow = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {username}")))?;
    Ok(row.into())
}

pub async fn list(pool: &DbPool) -> StoreResult<Vec<User>> {
    let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(User::from).collect())
}

pub async fn set_plan(pool: &DbPool, user_id: i64, plan_id: i64) -> StoreResult<User> {
    let row: UserRow = sqlx::query_as(
        "UPDATE users SET plan_id = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(plan_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
    Ok(row.into())
}

/// Paginated listing with search-by-username, for `GET /user`.
pub async fn list_page(
    pool: &DbPool,
    params: &ollama_fleet_core::PageParams,
) -> StoreResult<ollama_fleet_core::Page<User>> {
    let normalized = params.normalized();
    let search_pattern = normalized.search.as_ref().map(|s| format!("%{s}%"));

    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT * FROM users WHERE ($1::text IS NULL OR username ILIKE $1) \
         ORDER BY id ASC LIMIT $2 OFFSET $3",
    )
    .bind(&search_pattern)
    .bind(normalized.limit())
    .bind(normalized.offset())
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR username ILIKE $1)")
            .bind(&search_pattern)
            .fetch_one(pool)
            .await?;

    let items = rows.into_iter().map(User::from).collect();
    Ok(ollama_fleet_core::Page::new(items, total, params))
}

/// Updates whichever fields are `Some`; a `password_hash` update is the
/// caller's responsibility to hash first (this module has no auth
/// concerns, matching `ollama_fleet_core`'s layering).
pub async fn update(
    pool: &DbPool,
    user_id: i64,
    username: Option<&str>,
    password_hash: Option<&str>,
    is_admin: Option<bool>,
    plan_id: Option<i64>,
) -> StoreResult<User> {
    let row: UserRow = sqlx::query_as(
        r#"
        UPDATE users
        SET username = COALESCE($2, username),
            password_hash = COALESCE($3, password_hash),
            is_admin = COALESCE($4, is_admin),
            plan_id = COALESCE($5, plan_id),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(username)
    .bind(password_hash)
    .bind(is_admin)
    .bind(plan_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
    Ok(row.into())
}

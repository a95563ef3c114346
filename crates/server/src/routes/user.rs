//! Auth façade and user administration (spec.md §4.8, §6).
//!
//! `init`/`login` mirror the original's `/user/init` and `/user/login`
//! (`backend/src/user/router.py`): the first user ever created is forced
//! admin, every later signup goes through an admin-only create route
//! instead of a second public signup endpoint.

use axum::extract::{Path, Query, State};
use axum::Json;
use ollama_fleet_core::{Page, PageParams, User};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, issue_token, verify_password, AdminUser, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: User,
}

/// Creates the very first account. Once any user exists this always 409s
/// — later accounts are created by an admin via [`create`].
pub async fn init(State(state): State<AppState>, Json(body): Json<Credentials>) -> ApiResult<Json<TokenResponse>> {
    let existing = ollama_fleet_store::user::count(&state.pool)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if existing > 0 {
        return Err(ApiError::Conflict("an admin user already exists".to_string()));
    }

    let plan = ollama_fleet_store::plan::get_default(&state.pool).await?;
    let password_hash = hash_password(&body.password)?;
    let user = ollama_fleet_store::user::create(&state.pool, &body.username, &password_hash, true, plan.id).await?;
    let token = issue_token(&state, user.id)?;
    Ok(Json(TokenResponse { token, user }))
}

pub async fn login(State(state): State<AppState>, Json(body): Json<Credentials>) -> ApiResult<Json<TokenResponse>> {
    let user = ollama_fleet_store::user::get_by_username(&state.pool, &body.username)
        .await
        .map_err(|_| ApiError::AuthInvalid)?;
    if !verify_password(&body.password, &user.password_hash) {
        return Err(ApiError::AuthInvalid);
    }
    let token = issue_token(&state, user.id)?;
    Ok(Json(TokenResponse { token, user }))
}

pub async fn me(current: CurrentUser) -> Json<User> {
    Json(current.user)
}

#[derive(Deserialize)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<ChangePassword>,
) -> ApiResult<Json<User>> {
    if !verify_password(&body.current_password, &current.user.password_hash) {
        return Err(ApiError::AuthInvalid);
    }
    let new_hash = hash_password(&body.new_password)?;
    let user = ollama_fleet_store::user::update(&state.pool, current.user.id, None, Some(&new_hash), None, None)
        .await?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
    pub plan_id: Option<i64>,
}

pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateUser>,
) -> ApiResult<Json<User>> {
    let plan_id = match body.plan_id {
        Some(id) => id,
        None => ollama_fleet_store::plan::get_default(&state.pool).await?.id,
    };
    let password_hash = hash_password(&body.password)?;
    let user = ollama_fleet_store::user::create(
        &state.pool,
        &body.username,
        &password_hash,
        body.is_admin,
        plan_id,
    )
    .await?;
    Ok(Json(user))
}

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<User>>> {
    let page = ollama_fleet_store::user::list_page(&state.pool, &params).await?;
    Ok(Json(page))
}

pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<User>> {
    let user = ollama_fleet_store::user::get_by_id(&state.pool, user_id).await?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub is_admin: Option<bool>,
    pub plan_id: Option<i64>,
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i64>,
    Json(body): Json<UpdateUser>,
) -> ApiResult<Json<User>> {
    let user = ollama_fleet_store::user::update(
        &state.pool,
        user_id,
        body.username.as_deref(),
        None,
        body.is_admin,
        body.plan_id,
    )
    .await?;
    Ok(Json(user))
}

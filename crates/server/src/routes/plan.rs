//! Rate-limit tier administration (spec.md §3, §6). Every route here is
//! admin-only except `/plan/me`, which resolves the caller's own plan —
//! users have no route to list or browse plans they aren't on.

use axum::extract::{Path, Query, State};
use axum::Json;
use ollama_fleet_core::{Page, PageParams, Plan};
use serde::Deserialize;

use crate::auth::{AdminUser, CurrentUser};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePlan {
    pub name: String,
    pub description: String,
    pub rpm: i32,
    pub rpd: i32,
    #[serde(default)]
    pub is_default: bool,
}

pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreatePlan>,
) -> ApiResult<Json<Plan>> {
    let plan = ollama_fleet_store::plan::create(
        &state.pool,
        &body.name,
        &body.description,
        body.rpm,
        body.rpd,
        body.is_default,
    )
    .await?;
    Ok(Json(plan))
}

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<Plan>>> {
    let page = ollama_fleet_store::plan::list_page(&state.pool, &params).await?;
    Ok(Json(page))
}

pub async fn me(current: CurrentUser) -> Json<Plan> {
    Json(current.plan)
}

pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(plan_id): Path<i64>,
) -> ApiResult<Json<Plan>> {
    let plan = ollama_fleet_store::plan::get_by_id(&state.pool, plan_id).await?;
    Ok(Json(plan))
}

#[derive(Deserialize)]
pub struct UpdatePlan {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rpm: Option<i32>,
    pub rpd: Option<i32>,
    pub is_default: Option<bool>,
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(plan_id): Path<i64>,
    Json(body): Json<UpdatePlan>,
) -> ApiResult<Json<Plan>> {
    let plan = ollama_fleet_store::plan::update(
        &state.pool,
        plan_id,
        body.name.as_deref(),
        body.description.as_deref(),
        body.rpm,
        body.rpd,
        body.is_default,
    )
    .await?;
    Ok(Json(plan))
}

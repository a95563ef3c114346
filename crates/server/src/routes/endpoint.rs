//! Endpoint registry administration and on-demand probing (spec.md §6).

use axum::extract::{Path, Query, State};
use axum::Json;
use ollama_fleet_core::{AiModel, Endpoint, EndpointAiModel, EndpointStatus, EndpointTestTask, Page, PageParams};
use serde::{Deserialize, Serialize};

use crate::auth::{AdminUser, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateEndpoint {
    pub url: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct EndpointCreated {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub created: bool,
}

pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateEndpoint>,
) -> ApiResult<Json<EndpointCreated>> {
    let (endpoint, created) = ollama_fleet_store::endpoint::create_or_get(&state.pool, &body.url, &body.name).await?;
    if created {
        let _ = ollama_fleet_scheduler::schedule_on_demand(&state.pool, endpoint.id).await;
    }
    Ok(Json(EndpointCreated { endpoint, created }))
}

#[derive(Deserialize)]
pub struct BatchCreateEndpoint {
    pub endpoints: Vec<CreateEndpoint>,
}

pub async fn batch_create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<BatchCreateEndpoint>,
) -> ApiResult<Json<Vec<EndpointCreated>>> {
    let entries: Vec<(String, String)> = body
        .endpoints
        .into_iter()
        .map(|e| (e.url, e.name))
        .collect();
    let results = ollama_fleet_store::endpoint::batch_create_or_get(&state.pool, &entries).await?;
    let mut out = Vec::with_capacity(results.len());
    for (endpoint, created) in results {
        if created {
            let _ = ollama_fleet_scheduler::schedule_on_demand(&state.pool, endpoint.id).await;
        }
        out.push(EndpointCreated { endpoint, created });
    }
    Ok(Json(out))
}

#[derive(Serialize)]
pub struct EndpointSummary {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub model_count: i64,
    pub status: Option<EndpointStatus>,
}

pub async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<EndpointSummary>>> {
    let page = ollama_fleet_store::endpoint::list(&state.pool, &params).await?;
    let mut items = Vec::with_capacity(page.items.len());
    for endpoint in page.items {
        let model_count = ollama_fleet_store::endpoint::model_count(&state.pool, endpoint.id).await?;
        let status = ollama_fleet_store::endpoint::latest_status(&state.pool, endpoint.id).await?;
        items.push(EndpointSummary { endpoint, model_count, status });
    }
    Ok(Json(Page {
        items,
        total: page.total,
        page: page.page,
        size: page.size,
        pages: page.pages,
    }))
}

#[derive(Serialize)]
pub struct EndpointDetail {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub status: Option<EndpointStatus>,
    pub ai_models: Vec<(AiModel, EndpointAiModel)>,
}

pub async fn get(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(endpoint_id): Path<i64>,
) -> ApiResult<Json<EndpointDetail>> {
    let endpoint = ollama_fleet_store::endpoint::get_by_id(&state.pool, endpoint_id).await?;
    let status = ollama_fleet_store::endpoint::latest_status(&state.pool, endpoint_id).await?;
    let ai_models = ollama_fleet_store::endpoint_ai_model::list_links_for_endpoint(&state.pool, endpoint_id).await?;
    Ok(Json(EndpointDetail { endpoint, status, ai_models }))
}

#[derive(Deserialize)]
pub struct RenameEndpoint {
    pub name: String,
}

pub async fn rename(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(endpoint_id): Path<i64>,
    Json(body): Json<RenameEndpoint>,
) -> ApiResult<Json<Endpoint>> {
    let endpoint = ollama_fleet_store::endpoint::rename(&state.pool, endpoint_id, &body.name).await?;
    Ok(Json(endpoint))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(endpoint_id): Path<i64>,
) -> ApiResult<()> {
    ollama_fleet_store::endpoint::delete(&state.pool, endpoint_id).await?;
    Ok(())
}

#[derive(Deserialize)]
pub struct BatchDeleteEndpoint {
    pub endpoint_ids: Vec<i64>,
}

pub async fn batch_delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<BatchDeleteEndpoint>,
) -> ApiResult<()> {
    for endpoint_id in body.endpoint_ids {
        ollama_fleet_store::endpoint::delete(&state.pool, endpoint_id).await?;
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TestScheduled {
    pub scheduled: bool,
}

pub async fn test(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(endpoint_id): Path<i64>,
) -> ApiResult<Json<TestScheduled>> {
    ollama_fleet_store::endpoint::get_by_id(&state.pool, endpoint_id).await?;
    let scheduled = ollama_fleet_scheduler::schedule_on_demand(&state.pool, endpoint_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(TestScheduled { scheduled }))
}

#[derive(Deserialize)]
pub struct BatchTestEndpoint {
    pub endpoint_ids: Vec<i64>,
}

pub async fn batch_test(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<BatchTestEndpoint>,
) -> ApiResult<Json<Vec<TestScheduled>>> {
    let mut out = Vec::with_capacity(body.endpoint_ids.len());
    for endpoint_id in body.endpoint_ids {
        let scheduled = ollama_fleet_scheduler::schedule_on_demand(&state.pool, endpoint_id)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        out.push(TestScheduled { scheduled });
    }
    Ok(Json(out))
}

pub async fn current_task(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(endpoint_id): Path<i64>,
) -> ApiResult<Json<EndpointTestTask>> {
    let task = ollama_fleet_store::task::latest_for_endpoint(&state.pool, endpoint_id).await?;
    Ok(Json(task))
}

pub async fn get_task(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<EndpointTestTask>> {
    let task = ollama_fleet_store::task::get_by_id(&state.pool, task_id).await?;
    Ok(Json(task))
}

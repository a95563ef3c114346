//! Read-only AI model vocabulary browsing (spec.md §6). Models are never
//! created directly; they come into existence the first time a probe sees
//! them (`ollama_fleet_store::ai_model::get_or_create`).

use axum::extract::{Path, Query, State};
use axum::Json;
use ollama_fleet_core::{AiModel, Page, PageParams};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct AiModelSummary {
    #[serde(flatten)]
    pub model: AiModel,
    pub endpoint_count: i64,
}

pub async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<AiModelSummary>>> {
    let page = ollama_fleet_store::ai_model::list_page(&state.pool, &params).await?;
    let mut items = Vec::with_capacity(page.items.len());
    for model in page.items {
        let endpoint_count = ollama_fleet_store::ai_model::endpoint_count(&state.pool, model.id).await?;
        items.push(AiModelSummary { model, endpoint_count });
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
pub struct AiModelDetail {
    #[serde(flatten)]
    pub model: AiModel,
    pub endpoints: Vec<ollama_fleet_core::Endpoint>,
}

pub async fn get(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(model_id): Path<i64>,
) -> ApiResult<Json<AiModelDetail>> {
    let model = ollama_fleet_store::ai_model::get_by_id(&state.pool, model_id).await?;
    let endpoints =
        ollama_fleet_store::endpoint_ai_model::best_endpoints_for_model(&state.pool, &model.name, &model.tag).await?;
    Ok(Json(AiModelDetail { model, endpoints }))
}

//! API key issuance and revocation (spec.md §3, §6). A key is scoped to
//! the user who minted it; only an admin may touch someone else's.

use axum::extract::{Path, State};
use axum::Json;
use ollama_fleet_core::ApiKey;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateApiKey {
    pub name: String,
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<CreateApiKey>,
) -> ApiResult<Json<ApiKey>> {
    let key = ollama_fleet_store::api_key::create(&state.pool, current.user.id, &body.name).await?;
    Ok(Json(key))
}

pub async fn list(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Vec<ApiKey>>> {
    let keys = if current.user.is_admin {
        ollama_fleet_store::api_key::list_all(&state.pool).await?
    } else {
        ollama_fleet_store::api_key::list_for_user(&state.pool, current.user.id).await?
    };
    Ok(Json(keys))
}

pub async fn revoke(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(key_id): Path<i64>,
) -> ApiResult<()> {
    let key = ollama_fleet_store::api_key::get_by_id(&state.pool, key_id).await?;
    if key.user_id != current.user.id && !current.user.is_admin {
        return Err(ApiError::Forbidden);
    }
    ollama_fleet_store::api_key::revoke(&state.pool, key_id).await?;
    Ok(())
}

#[derive(Serialize)]
pub struct UsageStatsResponse {
    pub total_requests: i64,
    pub last_30_days_requests: i64,
    pub requests_today: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub requests_per_day: Vec<(chrono::NaiveDate, i64)>,
}

pub async fn usage(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(key_id): Path<i64>,
) -> ApiResult<Json<UsageStatsResponse>> {
    let key = ollama_fleet_store::api_key::get_by_id(&state.pool, key_id).await?;
    if key.user_id != current.user.id && !current.user.is_admin {
        return Err(ApiError::Forbidden);
    }
    let stats = ollama_fleet_store::api_key::usage_stats(&state.pool, key_id).await?;
    Ok(Json(UsageStatsResponse {
        total_requests: stats.total_requests,
        last_30_days_requests: stats.last_30_days_requests,
        requests_today: stats.requests_today,
        successful_requests: stats.successful_requests,
        failed_requests: stats.failed_requests,
        requests_per_day: stats.requests_per_day,
    }))
}

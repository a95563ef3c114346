//! System settings (spec.md §3, §6) — currently just the one key the
//! Scheduler polls, but kept keyed rather than a single flat struct so a
//! future setting doesn't need a new route.

use axum::extract::{Path, State};
use axum::Json;
use ollama_fleet_core::{SystemSetting, SystemSettingKey};
use serde::Deserialize;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<SystemSetting>>> {
    let keys = [SystemSettingKey::UpdateEndpointTaskIntervalHours];
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        match ollama_fleet_store::setting::get(&state.pool, key).await {
            Ok(setting) => out.push(setting),
            Err(ollama_fleet_store::StoreError::NotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Json(out))
}

pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(key): Path<String>,
) -> ApiResult<Json<SystemSetting>> {
    let key: SystemSettingKey = key.parse().map_err(ApiError::from)?;
    let setting = ollama_fleet_store::setting::get(&state.pool, key).await?;
    Ok(Json(setting))
}

#[derive(Deserialize)]
pub struct SetSetting {
    pub value: String,
}

pub async fn put(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(key): Path<String>,
    Json(body): Json<SetSetting>,
) -> ApiResult<Json<SystemSetting>> {
    let key: SystemSettingKey = key.parse().map_err(ApiError::from)?;
    let setting = ollama_fleet_store::setting::set(&state.pool, key, &body.value).await?;
    Ok(Json(setting))
}

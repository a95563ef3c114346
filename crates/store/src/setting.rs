use chrono::{DateTime, Utc};
use ollama_fleet_core::{SystemSetting, SystemSettingKey};
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};
use crate::pool::DbPool;

#[derive(FromRow)]
struct SettingRow {
    key: String,
    value: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SettingRow> for SystemSetting {
    type Error = StoreError;

    fn try_from(row: SettingRow) -> Result<Self, Self::Error> {
        let key: SystemSettingKey = row.key.parse()?;
        Ok(SystemSetting {
            key,
            value: row.value,
            created_at: row.created_at,
        })
    }
}

pub async fn get(pool: &DbPool, key: SystemSettingKey) -> StoreResult<SystemSetting> {
    let row: SettingRow = sqlx::query_as("SELECT * FROM system_settings WHERE key = $1")
        .bind(key.as_str())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("setting {key}")))?;
    row.try_into()
}

/// Validates `value` against `key`'s rules (spec.md §3: interval in
/// `1..=1440`) before persisting — an out-of-range write must 400, not
/// silently clamp.
pub async fn set(pool: &DbPool, key: SystemSettingKey, value: &str) -> StoreResult<SystemSetting> {
    SystemSetting::validate_value(key, value)?;
    let row: SettingRow = sqlx::query_as(
        r#"
        INSERT INTO system_settings (key, value)
        VALUES ($1, $2)
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
        RETURNING *
        "#,
    )
    .bind(key.as_str())
    .bind(value)
    .fetch_one(pool)
    .await?;
    row.try_into()
}

/// Convenience accessor for the one setting the Scheduler polls.
pub async fn update_endpoint_task_interval_hours(pool: &DbPool) -> StoreResult<i64> {
    let setting = get(pool, SystemSettingKey::UpdateEndpointTaskIntervalHours).await?;
    setting
        .value
        .parse()
        .map_err(|_| StoreError::Validation(format!("corrupt setting value {:?}", setting.value)))
}

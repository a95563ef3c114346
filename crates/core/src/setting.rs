use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The only setting key the core consumes today. Kept as an enum (rather
/// than a bare string) so a typo in a migration or a handler is a compile
/// error, not a silent no-op at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemSettingKey {
    UpdateEndpointTaskIntervalHours,
}

impl SystemSettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpdateEndpointTaskIntervalHours => "update_endpoint_task_interval_hours",
        }
    }
}

impl std::str::FromStr for SystemSettingKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update_endpoint_task_interval_hours" => Ok(Self::UpdateEndpointTaskIntervalHours),
            other => Err(DomainError::NotFound(format!("setting key {other}"))),
        }
    }
}

impl std::fmt::Display for SystemSettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSetting {
    pub key: SystemSettingKey,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

impl SystemSetting {
    /// Validates a candidate value for `key` before it is persisted.
    /// `update_endpoint_task_interval_hours` must be an integer in `1..=1440`.
    pub fn validate_value(key: SystemSettingKey, value: &str) -> Result<(), DomainError> {
        match key {
            SystemSettingKey::UpdateEndpointTaskIntervalHours => {
                let parsed: i64 = value.parse().map_err(|_| {
                    DomainError::Validation(format!(
                        "{}: expected an integer, got {value:?}",
                        key.as_str()
                    ))
                })?;
                if !(1..=1440).contains(&parsed) {
                    return Err(DomainError::Validation(format!(
                        "{}: must be between 1 and 1440, got {parsed}",
                        key.as_str()
                    )));
                }
                Ok(())
            }
        }
    }
}

pub const DEFAULT_UPDATE_ENDPOINT_TASK_INTERVAL_HOURS: &str = "24";

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: i64,
    pub key: String,
    pub name: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}

/// Append-only record of one proxied request, written exactly once per
/// request regardless of outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyUsageLog {
    pub id: i64,
    pub api_key_id: i64,
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub method: String,
    pub model: Option<String>,
    pub status_code: i32,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A rate-limit tier. Exactly one row has `is_default = true`; new users
/// inherit it at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub rpm: i32,
    pub rpd: i32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The first user ever created is forcibly made admin; every user after
/// that is whatever the caller (an existing admin) asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub plan_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//! Per-key RPM/RPD rate limiting (spec.md §4.6), counted against the
//! append-only usage log rather than an in-process counter — multiple
//! proxy replicas would all see the same limit without coordination, at
//! the cost of one count query per request. Module name and shape follow
//! the teacher's `rate_limit` module; the counting strategy itself is
//! grounded on the original's `check_rate_limits`
//! (`backend/src/apikey/service.py`), including its exact detail-string
//! wording so a client parsing `detail` for `"requests per minute"` keeps
//! working.

use chrono::{Duration, Utc};
use ollama_fleet_core::Plan;
use ollama_fleet_store::DbPool;

use crate::error::ApiError;

/// Checks both windows, RPM first. Best-effort: no row-locking, so a
/// small amount of over-admission under heavy concurrent load on the same
/// key is accepted (spec.md §4.6).
pub async fn check_rate_limits(pool: &DbPool, api_key_id: i64, plan: &Plan) -> Result<(), ApiError> {
    let now = Utc::now();

    let minute_ago = now - Duration::seconds(60);
    let rpm_count = ollama_fleet_store::api_key::count_usage_since(pool, api_key_id, minute_ago)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if rpm_count >= plan.rpm as i64 {
        return Err(ApiError::RateLimited(format!(
            "Rate limit exceeded: {rpm_count}/{} requests per minute",
            plan.rpm
        )));
    }

    let midnight = now.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
    let rpd_count = ollama_fleet_store::api_key::count_usage_since(pool, api_key_id, midnight)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if rpd_count >= plan.rpd as i64 {
        return Err(ApiError::RateLimited(format!(
            "Rate limit exceeded: {rpd_count}/{} requests per day",
            plan.rpd
        )));
    }

    Ok(())
}

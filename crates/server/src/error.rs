//! Maps every error this crate produces to an HTTP response, matching
//! the original's `HTTPException(status_code, detail=...)` shape: a JSON
//! body `{"detail": "..."}` plus the status. Grounded on the teacher's
//! `ServerError -> StatusCode` conversion (`crates/server/src/lib.rs`),
//! extended to a full `IntoResponse` impl since this service has no
//! framework-level catch-all to fall back on.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use ollama_fleet_client::UpstreamError;
use ollama_fleet_core::DomainError;
use ollama_fleet_store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing API key")]
    AuthMissing,

    #[error("invalid API key or credentials")]
    AuthInvalid,

    #[error("admin privileges required")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// All backends were tried and none succeeded; `status` carries the
    /// last upstream status when every failure agreed on one, else 502.
    #[error("all backends exhausted: {detail}")]
    UpstreamExhausted { status: u16, detail: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(m) => ApiError::NotFound(m),
            DomainError::Validation(m) => ApiError::Validation(m),
            DomainError::Conflict(m) => ApiError::Conflict(m),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(m) => ApiError::NotFound(m),
            StoreError::Validation(m) => ApiError::Validation(m),
            StoreError::Conflict(m) => ApiError::Conflict(m),
            StoreError::Database(e) => ApiError::Internal(e.to_string()),
            StoreError::Migration(e) => ApiError::Internal(e.to_string()),
        }
    }
}

/// `UPSTREAM_ERROR`/`UPSTREAM_TIMEOUT` from spec.md §7 are caught inside
/// the forwarder's failover loop and never reach this conversion; only the
/// final exhausted-all-backends case surfaces here, assembled explicitly
/// by the forwarder rather than via this `From`.
impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::AuthMissing | ApiError::AuthInvalid => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamExhausted { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let detail = match &self {
            ApiError::UpstreamExhausted { detail, .. } => detail.clone(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

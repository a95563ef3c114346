//! Bearer-token auth for the admin/user-facing routes (spec.md §4.8).
//!
//! Password hashing via `argon2` (the workspace's chosen stack; the
//! original uses bcrypt/passlib, but this is a rewrite, not a port) and
//! JWT issuance/verification via `jsonwebtoken`, carrying the user id as
//! the `sub` claim — mirroring the original's `{"id": user.id}` payload
//! shape (`backend/src/user/utils.py`) without copying its field name.
//! Extractors follow the teacher's `FromRequestParts` pattern used for
//! session lookups (`crates/server/src/websocket.rs`), adapted to decode
//! a JWT instead of reading a path segment.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use ollama_fleet_core::{Plan, User};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn issue_token(state: &AppState, user_id: i64) -> Result<String, ApiError> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        exp: (now + state.settings.jwt_expiry()).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.settings.app.secret_key.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
}

fn decode_token(state: &AppState, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.settings.app.secret_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::AuthInvalid)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// The proxy's own api-key lookup (spec.md §6), distinct from the JWT
/// bearer auth above: checked in order `X-API-Key` header, then
/// `Authorization: Bearer <key>`, then `?api_key=` query param.
pub fn bearer_or_header_api_key(
    headers: &axum::http::HeaderMap,
    query_params: &std::collections::HashMap<String, String>,
) -> Option<String> {
    if let Some(value) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(value.to_string());
    }
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }
    query_params.get("api_key").cloned()
}

/// The authenticated user plus their plan, resolved once per request.
pub struct CurrentUser {
    pub user: User,
    pub plan: Plan,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::AuthMissing)?;
        let claims = decode_token(state, token)?;
        let user = ollama_fleet_store::user::get_by_id(&state.pool, claims.sub)
            .await
            .map_err(|_| ApiError::AuthInvalid)?;
        let plan = ollama_fleet_store::plan::get_by_id(&state.pool, user.plan_id)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(CurrentUser { user, plan })
    }
}

/// Same as [`CurrentUser`] but additionally requires `is_admin`.
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.user.is_admin {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies_against_the_original() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(verify_password("correct-horse-battery-staple", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn api_key_lookup_prefers_header_over_bearer_over_query() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-api-key", "from-header".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer from-bearer".parse().unwrap());
        let mut query = std::collections::HashMap::new();
        query.insert("api_key".to_string(), "from-query".to_string());

        assert_eq!(bearer_or_header_api_key(&headers, &query), Some("from-header".to_string()));

        headers.remove("x-api-key");
        assert_eq!(bearer_or_header_api_key(&headers, &query), Some("from-bearer".to_string()));

        headers.remove(header::AUTHORIZATION);
        assert_eq!(bearer_or_header_api_key(&headers, &query), Some("from-query".to_string()));

        query.clear();
        assert_eq!(bearer_or_header_api_key(&headers, &query), None);
    }
}

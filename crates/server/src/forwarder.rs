//! The passthrough proxy handler (spec.md §4.7): the one route that isn't
//! CRUD. Authenticates, rate-limits, resolves the target model to an
//! ordered backend list via the Router, and forwards with failover.
//!
//! There is no teacher file for "reverse proxy with failover" (the
//! teacher is a voice agent, not a gateway); the streaming/unary split
//! and the first-byte commitment boundary are grounded directly in
//! spec.md §4.7/§9 and in the other example proxy
//! (`other_examples/0d4a96b2_mmogr-gglib__crates-gglib-proxy-src-server.rs.rs`),
//! which established the "build headers/params as plain maps, pass
//! straight to the backend client" shape this module follows.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use ollama_fleet_client::UpstreamError;
use ollama_fleet_core::AiModel;
use ollama_fleet_config::constants::timeouts;

use crate::auth::bearer_or_header_api_key;
use crate::error::ApiError;
use crate::rate_limit::check_rate_limits;
use crate::state::AppState;

/// Headers stripped before relaying to the backend: hop-by-hop plus the
/// client's own auth header, which must never reach the upstream.
const SCRUBBED_HEADERS: [&str; 3] = ["host", "content-length", "authorization"];

pub async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query_params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    forward_inner(&state, method, uri, headers, query_params, body)
        .await
        .unwrap_or_else(|e| e.into_response())
}

async fn forward_inner(
    state: &AppState,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query_params: HashMap<String, String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let key_value = bearer_or_header_api_key(&headers, &query_params).ok_or(ApiError::AuthMissing)?;

    let api_key = ollama_fleet_store::api_key::get_by_key(&state.pool, &key_value)
        .await
        .map_err(|_| ApiError::AuthInvalid)?;
    if api_key.revoked {
        return Err(ApiError::AuthInvalid);
    }
    let _ = ollama_fleet_store::api_key::touch_last_used(&state.pool, api_key.id).await;

    let user = ollama_fleet_store::user::get_by_id(&state.pool, api_key.user_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let plan = ollama_fleet_store::plan::get_by_id(&state.pool, user.plan_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let path = uri.path().trim_start_matches('/').to_string();
    let method_str = method.as_str().to_string();

    if let Err(e) = check_rate_limits(&state.pool, api_key.id, &plan).await {
        log_usage(state, api_key.id, &path, &method_str, None, StatusCode::TOO_MANY_REQUESTS.as_u16()).await;
        return Err(e);
    }

    if let Some(response) = shortcut_response(state, &path).await? {
        log_usage(state, api_key.id, &path, &method_str, None, StatusCode::OK.as_u16()).await;
        return Ok(response);
    }

    let body_json: Option<Value> = serde_json::from_slice(&body).ok();

    let model_str = body_json
        .as_ref()
        .and_then(|v| v.get("model"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| path.rsplit('/').next().filter(|s| !s.is_empty()).map(|s| s.to_string()));

    let model_str = match model_str {
        Some(s) => s,
        None => {
            log_usage(state, api_key.id, &path, &method_str, None, StatusCode::BAD_REQUEST.as_u16()).await;
            return Err(ApiError::Validation("request names no model".to_string()));
        }
    };

    let (name, tag) = match AiModel::parse_name_tag(&model_str) {
        Ok(parsed) => parsed,
        Err(e) => {
            log_usage(
                state,
                api_key.id,
                &path,
                &method_str,
                Some(bare_model_name(&model_str)),
                StatusCode::BAD_REQUEST.as_u16(),
            )
            .await;
            return Err(ApiError::from(e));
        }
    };

    let stream = stream_flag(&path, body_json.as_ref());

    let endpoints = ollama_fleet_store::endpoint_ai_model::best_endpoints_for_model(&state.pool, &name, &tag)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if endpoints.is_empty() {
        log_usage(
            state,
            api_key.id,
            &path,
            &method_str,
            Some(&name),
            StatusCode::NOT_FOUND.as_u16(),
        )
        .await;
        return Err(ApiError::NotFound(format!("no available backend serves {model_str}")));
    }

    let out_headers = scrub_headers(&headers);

    let mut last_error: Option<UpstreamError> = None;
    for (attempt, endpoint) in endpoints.iter().enumerate() {
        let client = match state.client_for(&endpoint.url) {
            Ok(client) => client,
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        };

        if stream {
            match try_stream_backend(&client, &method, &path, &out_headers, &query_params, body_json.as_ref()).await
            {
                Ok(response) => {
                    crate::metrics::record_upstream_failover(attempt);
                    log_usage(
                        state,
                        api_key.id,
                        &path,
                        &method_str,
                        Some(&name),
                        StatusCode::OK.as_u16(),
                    )
                    .await;
                    return Ok(response);
                }
                Err(e) => {
                    debug!("streaming attempt against {} failed before first byte: {e}", endpoint.url);
                    last_error = Some(e);
                    continue;
                }
            }
        } else {
            match client
                .raw_unary(method.clone(), &path, &out_headers, &query_params, body_json.as_ref())
                .await
            {
                Ok((meta, bytes)) => {
                    crate::metrics::record_upstream_failover(attempt);
                    log_usage(
                        state,
                        api_key.id,
                        &path,
                        &method_str,
                        Some(&name),
                        meta.status,
                    )
                    .await;
                    let mut response = Response::builder().status(meta.status);
                    if let Some(ct) = meta.content_type {
                        response = response.header(axum::http::header::CONTENT_TYPE, ct);
                    }
                    return Ok(response.body(Body::from(bytes)).unwrap());
                }
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            }
        }
    }

    let (status, detail) = match &last_error {
        Some(e) => match e.status() {
            Some(status) => (status, e.to_string()),
            None => (StatusCode::BAD_GATEWAY.as_u16(), e.to_string()),
        },
        None => (StatusCode::BAD_GATEWAY.as_u16(), "no backend accepted the request".to_string()),
    };
    log_usage(state, api_key.id, &path, &method_str, Some(&name), status).await;
    Err(ApiError::UpstreamExhausted { status, detail })
}

/// Races the first chunk against the first-byte deadline. On success, the
/// already-read chunk is chained back onto the stream so nothing is lost,
/// and the caller has committed: no further failover may happen past this
/// point (spec.md §9).
async fn try_stream_backend(
    client: &ollama_fleet_client::OllamaClient,
    method: &Method,
    path: &str,
    headers: &HashMap<String, String>,
    params: &HashMap<String, String>,
    json: Option<&Value>,
) -> Result<Response, UpstreamError> {
    let (meta, upstream) = client.raw_stream(method.clone(), path, headers, params, json).await?;
    let mut upstream = Box::pin(upstream);

    let first_chunk = tokio::time::timeout(
        Duration::from_secs(timeouts::FORWARDER_FIRST_BYTE_SECS),
        upstream.next(),
    )
    .await;

    let first_chunk = match first_chunk {
        Ok(Some(Ok(chunk))) => chunk,
        Ok(Some(Err(e))) => return Err(e),
        Ok(None) => return Err(UpstreamError::InvalidResponse("empty upstream stream".to_string())),
        Err(_) => return Err(UpstreamError::Timeout(Duration::from_secs(timeouts::FORWARDER_FIRST_BYTE_SECS))),
    };

    let rest = upstream.map(|chunk| chunk.map_err(std::io::Error::other));
    let body_stream = futures::stream::once(async move { Ok::<_, std::io::Error>(first_chunk) }).chain(rest);

    let mut response = Response::builder().status(meta.status);
    if let Some(ct) = meta.content_type {
        response = response.header(axum::http::header::CONTENT_TYPE, ct);
    }
    Ok(response.body(Body::from_stream(body_stream)).unwrap())
}

/// `""`, `api/tags`, `v1/models` bypass the Router entirely (spec.md §4.7
/// step 4).
async fn shortcut_response(state: &AppState, path: &str) -> Result<Option<Response>, ApiError> {
    match path {
        "" => Ok(Some(
            axum::Json(serde_json::json!({"message": "Ollama Fleet Proxy"})).into_response(),
        )),
        "api/tags" => {
            let models = ollama_fleet_store::ai_model::list(&state.pool)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            let mut served = Vec::new();
            for model in models {
                if ollama_fleet_store::ai_model::available_endpoint_count(&state.pool, model.id)
                    .await
                    .map_err(|e| ApiError::Internal(e.to_string()))?
                    > 0
                {
                    served.push(serde_json::json!({"name": model.display_name(), "model": model.display_name()}));
                }
            }
            Ok(Some(axum::Json(serde_json::json!({"models": served})).into_response()))
        }
        "v1/models" => {
            let models = ollama_fleet_store::ai_model::list(&state.pool)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            let mut data = Vec::new();
            for model in models {
                if ollama_fleet_store::ai_model::available_endpoint_count(&state.pool, model.id)
                    .await
                    .map_err(|e| ApiError::Internal(e.to_string()))?
                    > 0
                {
                    data.push(serde_json::json!({
                        "id": model.display_name(),
                        "object": "model",
                        "owned_by": "ollama-fleet-proxy",
                    }));
                }
            }
            Ok(Some(
                axum::Json(serde_json::json!({"object": "list", "data": data})).into_response(),
            ))
        }
        _ => Ok(None),
    }
}

/// Usage logs record the bare model name (`"llama3"`), not the full
/// `"name:tag"` identifier — matches what the original logs once it has
/// split the request's model string.
fn bare_model_name(model_str: &str) -> &str {
    model_str.split(':').next().unwrap_or(model_str)
}

fn stream_flag(path: &str, body_json: Option<&Value>) -> bool {
    let default_stream = matches!(path, "api/generate" | "api/chat");
    body_json
        .and_then(|v| v.get("stream"))
        .and_then(|v| v.as_bool())
        .unwrap_or(default_stream)
}

fn scrub_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| !SCRUBBED_HEADERS.contains(&name.as_str().to_lowercase().as_str()))
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
        .collect()
}

async fn log_usage(
    state: &AppState,
    api_key_id: i64,
    path: &str,
    method: &str,
    model: Option<&str>,
    status_code: u16,
) {
    let started = Instant::now();
    if let Err(e) =
        ollama_fleet_store::api_key::log_usage(&state.pool, api_key_id, path, method, model, status_code as i32)
            .await
    {
        warn!("failed to record usage log for api key {api_key_id}: {e}");
    }
    crate::metrics::record_request(route_label(path), status_code);
    crate::metrics::record_forward_latency(route_label(path), started.elapsed().as_secs_f64());
}

fn route_label(path: &str) -> &'static str {
    match path {
        "" => "root",
        "api/tags" => "api_tags",
        "v1/models" => "v1_models",
        _ => "forward",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_model_name_strips_the_tag() {
        assert_eq!(bare_model_name("llama3:8b"), "llama3");
        assert_eq!(bare_model_name("qwen"), "qwen");
    }

    #[test]
    fn generate_and_chat_stream_by_default() {
        assert!(stream_flag("api/generate", None));
        assert!(stream_flag("api/chat", None));
        assert!(!stream_flag("api/embeddings", None));
    }

    #[test]
    fn explicit_stream_field_overrides_the_default() {
        let body = serde_json::json!({"model": "llama3:8b", "stream": false});
        assert!(!stream_flag("api/generate", Some(&body)));

        let body = serde_json::json!({"model": "llama3:8b", "stream": true});
        assert!(stream_flag("api/embeddings", Some(&body)));
    }

    #[test]
    fn scrub_headers_drops_host_content_length_and_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "example.com".parse().unwrap());
        headers.insert("content-length", "42".parse().unwrap());
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        headers.insert("x-custom", "kept".parse().unwrap());

        let scrubbed = scrub_headers(&headers);
        assert_eq!(scrubbed.len(), 1);
        assert_eq!(scrubbed.get("x-custom"), Some(&"kept".to_string()));
    }
}

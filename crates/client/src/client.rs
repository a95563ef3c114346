//! A thin, typed client bound to one Ollama-compatible backend URL.
//!
//! Mirrors the shape of the teacher's [`OllamaBackend`] (one pooled
//! `reqwest::Client`, a long overall timeout, streaming NDJSON parsing that
//! skips malformed lines instead of failing the whole generation) but adds
//! the `raw` passthrough the Forwarder needs to proxy arbitrary routes.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::debug;

use crate::error::UpstreamError;
use crate::schema::{GenerateRequest, GenerateResponse, ListModelResponse, VersionResponse};

/// Overall deadline for a single HTTP call issued by this client. Per-call
/// deadlines (version probe ~10s, generate benchmark ~60s) are applied by
/// the caller via `tokio::time::timeout`; this is just a backstop so a
/// totally wedged socket cannot hang forever.
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

/// Status line and the few response headers the Forwarder is allowed to
/// preserve (spec §9: no generic header reflection).
#[derive(Debug, Clone)]
pub struct RawResponseMeta {
    pub status: u16,
    pub content_type: Option<String>,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_CLIENT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(UpstreamError::Http { status, body })
    }

    pub async fn version(&self) -> Result<VersionResponse, UpstreamError> {
        let response = self.http.get(self.url("/api/version")).send().await?;
        let response = Self::error_for_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
    }

    pub async fn tags(&self) -> Result<ListModelResponse, UpstreamError> {
        let response = self.http.get(self.url("/api/tags")).send().await?;
        let response = Self::error_for_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
    }

    /// Opens a streaming `/api/generate` call. Yields one item per
    /// newline-delimited JSON line; malformed lines are skipped with a
    /// debug log rather than surfaced, so one corrupt line mid-stream
    /// doesn't abort an otherwise healthy generation.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<impl Stream<Item = GenerateResponse>, UpstreamError> {
        let body = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: true,
        };
        let response = self
            .http
            .post(self.url("/api/generate"))
            .json(&body)
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        Ok(ndjson_stream(response.bytes_stream()))
    }

    /// Generic passthrough used by the Forwarder: forwards `method` +
    /// `path` with the given headers/query params/body to this backend,
    /// unary mode. Returns the raw response bytes for the client to relay
    /// verbatim (media type preserved via `RawResponseMeta`).
    pub async fn raw_unary(
        &self,
        method: reqwest::Method,
        path: &str,
        headers: &HashMap<String, String>,
        params: &HashMap<String, String>,
        json: Option<&serde_json::Value>,
    ) -> Result<(RawResponseMeta, Bytes), UpstreamError> {
        let mut request = self.http.request(method, self.url(path)).query(params);
        request = apply_headers(request, headers);
        if let Some(json) = json {
            request = request.json(json);
        }
        let response = request.send().await?;
        let response = Self::error_for_status(response).await?;
        let meta = RawResponseMeta {
            status: response.status().as_u16(),
            content_type: content_type_of(&response),
        };
        let bytes = response.bytes().await?;
        Ok((meta, bytes))
    }

    /// Same as [`Self::raw_unary`] but keeps the connection open and
    /// yields raw byte chunks as they arrive, for streaming passthrough.
    pub async fn raw_stream(
        &self,
        method: reqwest::Method,
        path: &str,
        headers: &HashMap<String, String>,
        params: &HashMap<String, String>,
        json: Option<&serde_json::Value>,
    ) -> Result<(RawResponseMeta, impl Stream<Item = Result<Bytes, UpstreamError>>), UpstreamError>
    {
        let mut request = self.http.request(method, self.url(path)).query(params);
        request = apply_headers(request, headers);
        if let Some(json) = json {
            request = request.json(json);
        }
        let response = request.send().await?;
        let response = Self::error_for_status(response).await?;
        let meta = RawResponseMeta {
            status: response.status().as_u16(),
            content_type: content_type_of(&response),
        };
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(UpstreamError::from));
        Ok((meta, stream))
    }
}

fn content_type_of(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn apply_headers(mut request: reqwest::RequestBuilder, headers: &HashMap<String, String>) -> reqwest::RequestBuilder {
    for (key, value) in headers {
        request = request.header(key, value);
    }
    request
}

fn ndjson_stream(
    mut bytes_stream: impl Stream<Item = reqwest::Result<Bytes>> + Unpin + Send + 'static,
) -> impl Stream<Item = GenerateResponse> {
    async_stream::stream! {
        let mut buffer = String::new();
        while let Some(chunk) = bytes_stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    debug!("generate stream transport error: {e}");
                    break;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].trim().to_string();
                buffer.drain(..=pos);
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<GenerateResponse>(&line) {
                    Ok(parsed) => yield parsed,
                    Err(e) => {
                        debug!("skipping malformed generate line: {e}");
                    }
                }
            }
        }
        let trailing = buffer.trim();
        if !trailing.is_empty() {
            if let Ok(parsed) = serde_json::from_str::<GenerateResponse>(trailing) {
                yield parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_regardless_of_slashes() {
        let client = OllamaClient::new("http://host:11434/").unwrap();
        assert_eq!(client.url("/api/tags"), "http://host:11434/api/tags");
        assert_eq!(client.url("api/tags"), "http://host:11434/api/tags");
    }
}

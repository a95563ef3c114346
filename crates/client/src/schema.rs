//! Wire types for the subset of the Ollama HTTP API this proxy speaks:
//! `/api/version`, `/api/tags`, `/api/generate`. Field names and optionality
//! mirror `backend/src/ollama/schema.py` in the system this client replaces.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelDetails {
    pub parent_model: Option<String>,
    pub format: Option<String>,
    pub family: Option<String>,
    pub families: Option<Vec<String>>,
    pub parameter_size: Option<String>,
    pub quantization_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagModel {
    #[serde(default)]
    pub model: String,
    pub modified_at: Option<String>,
    pub digest: Option<String>,
    pub size: Option<u64>,
    pub details: Option<ModelDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListModelResponse {
    #[serde(default)]
    pub models: Vec<TagModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

/// One line of a streamed (or the single unary) `/api/generate` response.
/// When streaming, every line but the last carries a `response` fragment
/// and `done: false`; the final line carries `done: true` and, if the
/// server reports it, `eval_count`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub eval_count: Option<i64>,
    #[serde(default)]
    pub eval_duration: Option<i64>,
}

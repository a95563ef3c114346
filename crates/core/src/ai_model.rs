use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Status of one `(endpoint, model)` pairing. `Missing` has no equivalent on
/// `EndpointStatus`: it means the model used to be reported by this backend
/// and no longer is, whereas an endpoint itself is never "missing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiModelStatus {
    Available,
    Unavailable,
    Fake,
    Missing,
}

impl AiModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Fake => "fake",
            Self::Missing => "missing",
        }
    }
}

impl std::str::FromStr for AiModelStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "unavailable" => Ok(Self::Unavailable),
            "fake" => Ok(Self::Fake),
            "missing" => Ok(Self::Missing),
            other => Err(DomainError::Validation(format!(
                "unknown ai model status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for AiModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A served model identified by `(name, tag)`, e.g. `llama3` / `8b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiModel {
    pub id: i64,
    pub name: String,
    pub tag: String,
    pub created_at: DateTime<Utc>,
}

impl AiModel {
    /// Parses the `"name:tag"` form used on the wire (Ollama's `tags`
    /// response and the forwarder's model extraction).
    pub fn parse_name_tag(s: &str) -> Result<(String, String), DomainError> {
        match s.split_once(':') {
            Some((name, tag)) if !name.is_empty() && !tag.is_empty() => {
                Ok((name.to_string(), tag.to_string()))
            }
            _ => Err(DomainError::Validation(format!(
                "model identifier must be of the form \"name:tag\", got {s:?}"
            ))),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

/// Current state of one `(endpoint, model)` pairing. Mutated in place by
/// every probe; the append-only history lives in `AiModelPerformance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointAiModel {
    pub endpoint_id: i64,
    pub ai_model_id: i64,
    pub status: AiModelStatus,
    pub token_per_second: f64,
    pub max_connection_time: f64,
}

/// One model's raw measurement from a single probe pass, before it has been
/// written anywhere. `status = Missing` represents a model that used to be
/// linked to the endpoint being probed and was not reported this time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeasurement {
    pub name: String,
    pub tag: String,
    pub status: AiModelStatus,
    pub token_per_second: f64,
    pub connection_time: f64,
    pub total_time: f64,
    pub output: String,
    pub output_tokens: i64,
}

/// Append-only per-measurement row. One is written per model per probe,
/// including for models that disappeared (`status = Missing`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiModelPerformance {
    pub id: i64,
    pub endpoint_id: i64,
    pub ai_model_id: i64,
    pub status: AiModelStatus,
    pub token_per_second: f64,
    pub connection_time: f64,
    pub total_time: f64,
    pub output: String,
    pub output_tokens: i64,
    pub created_at: DateTime<Utc>,
}

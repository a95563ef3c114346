use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot classification written by a probe and read by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Available,
    Unavailable,
    Fake,
}

impl EndpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Fake => "fake",
        }
    }
}

impl std::str::FromStr for EndpointStatus {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "unavailable" => Ok(Self::Unavailable),
            "fake" => Ok(Self::Fake),
            other => Err(crate::error::DomainError::Validation(format!(
                "unknown endpoint status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered Ollama-compatible backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Raw probe result for the endpoint itself, before it has been written
/// anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointMeasurement {
    pub status: EndpointStatus,
    pub ollama_version: Option<String>,
}

/// Append-only liveness snapshot. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointPerformance {
    pub id: i64,
    pub endpoint_id: i64,
    pub status: EndpointStatus,
    pub ollama_version: Option<String>,
    pub created_at: DateTime<Utc>,
}

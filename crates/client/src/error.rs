use thiserror::Error;

/// Failure modes of a single HTTP call to an Ollama-compatible backend.
/// Probe and Forwarder both match on this to decide whether to fail over
/// or give up.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream response was not valid JSON: {0}")]
    InvalidResponse(String),

    #[error("upstream timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl UpstreamError {
    /// HTTP status to report to the caller when this error is not
    /// recovered by failover, or `None` when there was no HTTP response at
    /// all (transport failure, timeout) to preserve.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

use thiserror::Error;

/// Errors that can arise from domain-level validation or lookups, shared by
/// every crate that works with these entities directly (store, probe,
/// scheduler). HTTP-facing error mapping lives in `ollama_fleet_server`,
/// which wraps these as needed.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

impl From<ollama_fleet_core::DomainError> for StoreError {
    fn from(err: ollama_fleet_core::DomainError) -> Self {
        match err {
            ollama_fleet_core::DomainError::NotFound(m) => StoreError::NotFound(m),
            ollama_fleet_core::DomainError::Validation(m) => StoreError::Validation(m),
            ollama_fleet_core::DomainError::Conflict(m) => StoreError::Conflict(m),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

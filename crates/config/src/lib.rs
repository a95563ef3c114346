//! Configuration for the ollama fleet proxy.
//!
//! Loads from `config/default.toml` (optional), `config/{env}.toml`
//! (optional), then environment variables with `__` nesting — highest
//! priority wins. See [`settings::load_settings`].

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, AppConfig, DatabaseConfig, RuntimeEnvironment, SchedulerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

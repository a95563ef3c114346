//! Layered settings: environment variables (with `__` nesting) layered over
//! optional TOML files, matching the teacher's `load_settings` shape
//! (`config::Config` builder, `Environment::with_prefix(...).separator("__")`).

use std::time::Duration;

use serde::Deserialize;

use crate::ConfigError;

/// `DATABASE__*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub db: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    10
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.db
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    Dev,
    Prod,
}

impl Default for RuntimeEnvironment {
    fn default() -> Self {
        Self::Dev
    }
}

/// `APP__*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub secret_key: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub env: RuntimeEnvironment,
    #[serde(default = "default_jwt_expiry_minutes")]
    pub jwt_expiry_minutes: i64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "crate::constants::default_fake_markers")]
    pub fake_markers: Vec<String>,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_jwt_expiry_minutes() -> i64 {
    60 * 24
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

/// Knobs for the Scheduler that aren't stored as a `SystemSetting` row
/// (those live in the DB so they can change without a restart; these are
/// process-lifetime and only change via redeploy).
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,
}

fn default_max_concurrent_probes() -> usize {
    crate::constants::limits::DEFAULT_MAX_CONCURRENT_PROBES
}

fn default_warmup_secs() -> u64 {
    crate::constants::timeouts::SCHEDULER_WARMUP_SECS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_probes: default_max_concurrent_probes(),
            warmup_secs: default_warmup_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Settings {
    pub fn jwt_expiry(&self) -> Duration {
        Duration::from_secs((self.app.jwt_expiry_minutes.max(0) as u64) * 60)
    }
}

/// Loads settings from `config/default.toml` (optional), `config/{env}.toml`
/// (optional, selected by `APP__ENV`), then environment variables — highest
/// priority wins. Nested keys use `__` as the separator, e.g.
/// `DATABASE__HOST=localhost`.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let base_env = std::env::var("APP__ENV").unwrap_or_else(|_| "dev".to_string());

    let builder = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(config::File::with_name(&format!("config/{base_env}")).required(false))
        .add_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        );

    let raw = builder.build()?;
    let settings: Settings = raw.try_deserialize()?;

    if settings.app.secret_key.trim().is_empty() {
        return Err(ConfigError::MissingField("APP__SECRET_KEY".to_string()));
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_string_has_expected_shape() {
        let db = DatabaseConfig {
            host: "db".to_string(),
            port: 5432,
            username: "user".to_string(),
            password: "pass".to_string(),
            db: "fleet".to_string(),
            max_connections: 10,
        };
        assert_eq!(db.connection_string(), "postgres://user:pass@db:5432/fleet");
    }

    #[test]
    fn jwt_expiry_converts_minutes_to_duration() {
        let settings = Settings {
            database: DatabaseConfig {
                host: "db".to_string(),
                port: 5432,
                username: "u".to_string(),
                password: "p".to_string(),
                db: "d".to_string(),
                max_connections: 10,
            },
            app: AppConfig {
                secret_key: "k".to_string(),
                algorithm: "HS256".to_string(),
                log_level: "info".to_string(),
                env: RuntimeEnvironment::Dev,
                jwt_expiry_minutes: 90,
                bind_addr: "0.0.0.0:8000".to_string(),
                cors_origins: vec![],
                fake_markers: crate::constants::default_fake_markers(),
            },
            scheduler: SchedulerConfig::default(),
        };
        assert_eq!(settings.jwt_expiry(), Duration::from_secs(90 * 60));
    }
}

use ollama_fleet_config::DatabaseConfig;
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::Pool;
use tracing::info;

use crate::error::StoreResult;

pub type DbPool = Pool<Postgres>;

/// Opens the connection pool and runs embedded migrations (an ordinary
/// create-all at startup, per spec.md §6 — no down-migrations).
pub async fn connect(config: &DatabaseConfig) -> StoreResult<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_string())
        .await?;

    info!("running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

// storefront/src/db/mod.rs

pub mod seed;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::Result as AppResult;

pub async fn connect(config: &AppConfig) -> AppResult<PgPool> {
  let pool = PgPoolOptions::new()
    .max_connections(config.database_max_connections)
    .acquire_timeout(Duration::from_secs(5))
    .connect(&config.database_url)
    .await?;
  info!(max_connections = config.database_max_connections, "Database pool ready.");
  Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> AppResult<()> {
  sqlx::migrate!("./migrations").run(pool).await?;
  info!("Database migrations applied.");
  Ok(())
}

/// `SELECT 1`, for readiness checks.
pub async fn ping(pool: &PgPool) -> AppResult<()> {
  sqlx::query("SELECT 1").execute(pool).await?;
  Ok(())
}

//! Database pool and migrations

use arenarr_core::{ArenarrError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

pub type DatabasePool = PgPool;

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 30,
        }
    }
}

/// Create the connection pool.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| ArenarrError::DatabaseError {
            message: format!("failed to connect: {e}"),
        })?;
    info!("database pool ready");
    Ok(pool)
}

/// Apply pending migrations from the bundled `migrations/` directory.
pub async fn run_migrations(pool: &DatabasePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| ArenarrError::DatabaseError {
            message: format!("migration failed: {e}"),
        })?;
    info!("database migrations applied");
    Ok(())
}

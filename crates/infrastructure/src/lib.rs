//! Arenarr infrastructure
//!
//! PostgreSQL implementations of the core repository traits. The database is
//! the source of truth; everything here is mechanical row mapping around
//! sqlx and the migrations under `migrations/`.

pub mod database;
pub mod repositories;

pub use database::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use repositories::*;

//! Indexer configuration and status repository

use arenarr_core::domain::repositories::IndexerRepository;
use arenarr_core::models::indexer::{Indexer, IndexerProtocol, IndexerStatusRecord};
use arenarr_core::{ArenarrError, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::str::FromStr;

/// PostgreSQL implementation of `IndexerRepository`
pub struct PostgresIndexerRepository {
    pool: PgPool,
}

impl PostgresIndexerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_indexer(row: &sqlx::postgres::PgRow) -> Result<Indexer> {
        let protocol_str: String = row.try_get("protocol")?;
        let protocol =
            IndexerProtocol::from_str(&protocol_str).map_err(|e| ArenarrError::DatabaseError {
                message: format!("invalid indexer protocol: {e}"),
            })?;

        let categories: serde_json::Value = row.try_get("categories")?;
        let categories =
            serde_json::from_value(categories).map_err(|e| ArenarrError::DatabaseError {
                message: format!("invalid categories: {e}"),
            })?;

        Ok(Indexer {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            protocol,
            base_url: row.try_get("base_url")?,
            api_key: row.try_get("api_key")?,
            categories,
            enabled: row.try_get("enabled")?,
            enable_rss: row.try_get("enable_rss")?,
            enable_automatic_search: row.try_get("enable_automatic_search")?,
            priority: row.try_get("priority")?,
            minimum_seeders: row.try_get("minimum_seeders")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_status(row: &sqlx::postgres::PgRow) -> Result<IndexerStatusRecord> {
        Ok(IndexerStatusRecord {
            indexer_id: row.try_get("indexer_id")?,
            consecutive_failures: row.try_get::<i32, _>("consecutive_failures")? as u32,
            disabled_until: row.try_get("disabled_until")?,
            last_success: row.try_get("last_success")?,
            last_error: row.try_get("last_error")?,
        })
    }
}

#[async_trait]
impl IndexerRepository for PostgresIndexerRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Indexer>> {
        let row = sqlx::query("SELECT * FROM indexers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| Self::row_to_indexer(&row)).transpose()
    }

    async fn list_enabled(&self) -> Result<Vec<Indexer>> {
        let rows = sqlx::query("SELECT * FROM indexers WHERE enabled ORDER BY priority, id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_indexer).collect()
    }

    async fn load_statuses(&self) -> Result<Vec<IndexerStatusRecord>> {
        let rows = sqlx::query("SELECT * FROM indexer_status")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_status).collect()
    }

    async fn save_status(&self, status: &IndexerStatusRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO indexer_status (
                indexer_id, consecutive_failures, disabled_until, last_success, last_error
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (indexer_id) DO UPDATE SET
                consecutive_failures = EXCLUDED.consecutive_failures,
                disabled_until = EXCLUDED.disabled_until,
                last_success = EXCLUDED.last_success,
                last_error = EXCLUDED.last_error
            "#,
        )
        .bind(status.indexer_id)
        .bind(status.consecutive_failures as i32)
        .bind(status.disabled_until)
        .bind(status.last_success)
        .bind(&status.last_error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

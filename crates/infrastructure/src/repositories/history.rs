//! Import history repository

use arenarr_core::domain::repositories::HistoryRepository;
use arenarr_core::models::library::ImportHistory;
use arenarr_core::Result;
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL implementation of `HistoryRepository`
pub struct PostgresHistoryRepository {
    pool: PgPool,
}

impl PostgresHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for PostgresHistoryRepository {
    async fn record(&self, history: &ImportHistory) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO import_history (
                id, event_id, event_file_id, source_path, destination_path,
                quality, decision, imported_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(history.id)
        .bind(history.event_id)
        .bind(history.event_file_id)
        .bind(&history.source_path)
        .bind(&history.destination_path)
        .bind(&history.quality)
        .bind(&history.decision)
        .bind(history.imported_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

//! Download queue repository

use arenarr_core::domain::repositories::QueueRepository;
use arenarr_core::models::queue::{DownloadQueueItem, QueueStatus};
use arenarr_core::{ArenarrError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

/// PostgreSQL implementation of `QueueRepository`
pub struct PostgresQueueRepository {
    pool: PgPool,
}

impl PostgresQueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_item(row: &sqlx::postgres::PgRow) -> Result<DownloadQueueItem> {
        let status_str: String = row.try_get("status")?;
        let status = QueueStatus::from_str(&status_str).map_err(|e| ArenarrError::DatabaseError {
            message: format!("invalid queue status: {e}"),
        })?;

        let snapshot: serde_json::Value = row.try_get("release_snapshot")?;
        let release = serde_json::from_value(snapshot).map_err(|e| ArenarrError::DatabaseError {
            message: format!("invalid release snapshot: {e}"),
        })?;

        Ok(DownloadQueueItem {
            id: row.try_get("id")?,
            event_id: row.try_get("event_id")?,
            release,
            download_client_id: row.try_get("download_client_id")?,
            download_id: row.try_get("download_id")?,
            status,
            progress: row.try_get("progress")?,
            downloaded_bytes: row.try_get("downloaded_bytes")?,
            size_bytes: row.try_get("size_bytes")?,
            time_remaining_secs: row.try_get("time_remaining_secs")?,
            retry_count: row.try_get::<i32, _>("retry_count")? as u32,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            last_update: row.try_get("last_update")?,
        })
    }
}

#[async_trait]
impl QueueRepository for PostgresQueueRepository {
    async fn add(&self, item: &DownloadQueueItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO download_queue (
                id, event_id, release_snapshot, torrent_info_hash, download_client_id,
                download_id, status, progress, downloaded_bytes, size_bytes,
                time_remaining_secs, retry_count, error_message, created_at, last_update
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(item.id)
        .bind(item.event_id)
        .bind(serde_json::to_value(&item.release).unwrap_or_default())
        .bind(&item.release.torrent_info_hash)
        .bind(item.download_client_id)
        .bind(&item.download_id)
        .bind(item.status.to_string())
        .bind(item.progress)
        .bind(item.downloaded_bytes)
        .bind(item.size_bytes)
        .bind(item.time_remaining_secs)
        .bind(item.retry_count as i32)
        .bind(&item.error_message)
        .bind(item.created_at)
        .bind(item.last_update)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, item: &DownloadQueueItem) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE download_queue SET
                download_id = $2, status = $3, progress = $4, downloaded_bytes = $5,
                size_bytes = $6, time_remaining_secs = $7, retry_count = $8,
                error_message = $9, last_update = $10
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(&item.download_id)
        .bind(item.status.to_string())
        .bind(item.progress)
        .bind(item.downloaded_bytes)
        .bind(item.size_bytes)
        .bind(item.time_remaining_secs)
        .bind(item.retry_count as i32)
        .bind(&item.error_message)
        .bind(item.last_update)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DownloadQueueItem>> {
        let row = sqlx::query("SELECT * FROM download_queue WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| Self::row_to_item(&row)).transpose()
    }

    async fn find_active(&self) -> Result<Vec<DownloadQueueItem>> {
        let rows = sqlx::query(
            "SELECT * FROM download_queue WHERE status NOT IN ('imported', 'failed') ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_item).collect()
    }

    async fn find_by_event(&self, event_id: Uuid) -> Result<Vec<DownloadQueueItem>> {
        let rows =
            sqlx::query("SELECT * FROM download_queue WHERE event_id = $1 ORDER BY created_at")
                .bind(event_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(Self::row_to_item).collect()
    }

    async fn find_latest_failed(
        &self,
        event_id: Uuid,
        torrent_info_hash: &str,
    ) -> Result<Option<DownloadQueueItem>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM download_queue
            WHERE event_id = $1 AND torrent_info_hash = $2 AND status = 'failed'
            ORDER BY last_update DESC
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .bind(torrent_info_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| Self::row_to_item(&row)).transpose()
    }

    async fn count_failures(&self, event_id: Uuid, torrent_info_hash: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n FROM download_queue
            WHERE event_id = $1 AND torrent_info_hash = $2 AND status = 'failed'
            "#,
        )
        .bind(event_id)
        .bind(torrent_info_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("n")?)
    }

    async fn remove_stale(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM download_queue
            WHERE status IN ('imported', 'failed') AND last_update < $1
            "#,
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

//! Blocklist repository

use arenarr_core::domain::repositories::BlocklistRepository;
use arenarr_core::models::blocklist::BlocklistItem;
use arenarr_core::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// PostgreSQL implementation of `BlocklistRepository`
pub struct PostgresBlocklistRepository {
    pool: PgPool,
}

impl PostgresBlocklistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlocklistRepository for PostgresBlocklistRepository {
    async fn add(&self, item: &BlocklistItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO blocklist (id, event_id, torrent_info_hash, title, reason, added)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (event_id, torrent_info_hash) DO NOTHING
            "#,
        )
        .bind(item.id)
        .bind(item.event_id)
        .bind(&item.torrent_info_hash)
        .bind(&item.title)
        .bind(&item.reason)
        .bind(item.added)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn contains(&self, event_id: Uuid, torrent_info_hash: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM blocklist WHERE event_id = $1 AND torrent_info_hash = $2",
        )
        .bind(event_id)
        .bind(torrent_info_hash)
        .fetch_one(&self.pool)
        .await?;
        let count: i64 = row.try_get("n")?;
        Ok(count > 0)
    }
}

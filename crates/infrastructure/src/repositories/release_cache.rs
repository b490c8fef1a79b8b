//! Release cache repository
//!
//! Content-addressed by guid. Batch ingest uses `ON CONFLICT (guid) DO
//! UPDATE` so concurrent workers upserting the same release resolve to one
//! row and refresh only the volatile fields.

use arenarr_core::domain::repositories::ReleaseCacheRepository;
use arenarr_core::models::release::{CachedRelease, ReleaseProtocol};
use arenarr_core::{ArenarrError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use std::str::FromStr;
use tracing::debug;

/// PostgreSQL implementation of `ReleaseCacheRepository`
pub struct PostgresReleaseCacheRepository {
    pool: PgPool,
}

impl PostgresReleaseCacheRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_release(row: &sqlx::postgres::PgRow) -> Result<CachedRelease> {
        let protocol_str: String = row.try_get("protocol")?;
        let protocol =
            ReleaseProtocol::from_str(&protocol_str).map_err(|e| ArenarrError::DatabaseError {
                message: format!("invalid protocol column: {e}"),
            })?;

        let search_terms: serde_json::Value = row.try_get("search_terms")?;
        let search_terms =
            serde_json::from_value(search_terms).map_err(|e| ArenarrError::DatabaseError {
                message: format!("invalid search_terms: {e}"),
            })?;

        let indexer_flags: serde_json::Value = row.try_get("indexer_flags")?;
        let indexer_flags =
            serde_json::from_value(indexer_flags).map_err(|e| ArenarrError::DatabaseError {
                message: format!("invalid indexer_flags: {e}"),
            })?;

        Ok(CachedRelease {
            guid: row.try_get("guid")?,
            title: row.try_get("title")?,
            normalized_title: row.try_get("normalized_title")?,
            search_terms,
            download_url: row.try_get("download_url")?,
            info_url: row.try_get("info_url")?,
            indexer_id: row.try_get("indexer_id")?,
            indexer: row.try_get("indexer")?,
            protocol,
            torrent_info_hash: row.try_get("torrent_info_hash")?,
            size_bytes: row.try_get("size_bytes")?,
            seeders: row.try_get("seeders")?,
            leechers: row.try_get("leechers")?,
            publish_date: row.try_get("publish_date")?,
            indexer_flags,
            year: row.try_get("year")?,
            month: row.try_get::<Option<i32>, _>("month")?.map(|m| m as u32),
            day: row.try_get::<Option<i32>, _>("day")?.map(|d| d as u32),
            round_number: row
                .try_get::<Option<i32>, _>("round_number")?
                .map(|r| r as u32),
            sport_prefix: row.try_get("sport_prefix")?,
            from_rss: row.try_get("from_rss")?,
            cached_at: row.try_get("cached_at")?,
            last_seen: row.try_get("last_seen")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

#[async_trait]
impl ReleaseCacheRepository for PostgresReleaseCacheRepository {
    async fn upsert_batch(&self, releases: &[CachedRelease]) -> Result<usize> {
        let mut written = 0;
        for release in releases {
            let search_text = format!(
                "{} {}",
                release.normalized_title,
                release.search_terms.join(" ")
            );
            let result = sqlx::query(
                r#"
                INSERT INTO release_cache (
                    guid, title, normalized_title, search_terms, search_text, download_url,
                    info_url, indexer_id, indexer, protocol, torrent_info_hash, size_bytes,
                    seeders, leechers, publish_date, indexer_flags, year, month, day,
                    round_number, sport_prefix, from_rss, cached_at, last_seen, expires_at
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
                )
                ON CONFLICT (guid) DO UPDATE SET
                    seeders = EXCLUDED.seeders,
                    leechers = EXCLUDED.leechers,
                    last_seen = EXCLUDED.last_seen,
                    expires_at = EXCLUDED.expires_at
                "#,
            )
            .bind(&release.guid)
            .bind(&release.title)
            .bind(&release.normalized_title)
            .bind(serde_json::to_value(&release.search_terms).unwrap_or_default())
            .bind(&search_text)
            .bind(&release.download_url)
            .bind(&release.info_url)
            .bind(release.indexer_id)
            .bind(&release.indexer)
            .bind(release.protocol.to_string())
            .bind(&release.torrent_info_hash)
            .bind(release.size_bytes)
            .bind(release.seeders)
            .bind(release.leechers)
            .bind(release.publish_date)
            .bind(serde_json::to_value(&release.indexer_flags).unwrap_or_default())
            .bind(release.year)
            .bind(release.month.map(|m| m as i32))
            .bind(release.day.map(|d| d as i32))
            .bind(release.round_number.map(|r| r as i32))
            .bind(&release.sport_prefix)
            .bind(release.from_rss)
            .bind(release.cached_at)
            .bind(release.last_seen)
            .bind(release.expires_at)
            .execute(&self.pool)
            .await?;
            written += result.rows_affected() as usize;
        }
        debug!(batch = releases.len(), written, "release cache ingest");
        Ok(written)
    }

    async fn find_candidates(
        &self,
        sport_prefix: Option<&str>,
        year: Option<i32>,
        limit: i64,
    ) -> Result<Vec<CachedRelease>> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT * FROM release_cache WHERE expires_at > now()");
        if let Some(sport_prefix) = sport_prefix {
            builder.push(" AND sport_prefix = ");
            builder.push_bind(sport_prefix);
        }
        if let Some(year) = year {
            builder.push(" AND year = ");
            builder.push_bind(year);
        }
        builder.push(" ORDER BY publish_date DESC NULLS LAST LIMIT ");
        builder.push_bind(limit);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_release).collect()
    }

    async fn find_by_query(&self, terms: &[String], max: i64) -> Result<Vec<CachedRelease>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT * FROM release_cache WHERE expires_at > now()");
        for term in terms {
            builder.push(" AND search_text LIKE ");
            builder.push_bind(format!("%{}%", term.to_lowercase()));
        }
        builder.push(" ORDER BY publish_date DESC NULLS LAST LIMIT ");
        builder.push_bind(max);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_release).collect()
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM release_cache WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM release_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

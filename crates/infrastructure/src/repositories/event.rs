//! Event and event-file repositories

use arenarr_core::domain::repositories::{EventFileRepository, EventRepository};
use arenarr_core::models::event::{Event, EventFile, Sport};
use arenarr_core::{ArenarrError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

/// PostgreSQL implementation of `EventRepository`
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<Event> {
        let sport_str: String = row.try_get("sport")?;
        let sport = Sport::from_str(&sport_str).map_err(|e| ArenarrError::DatabaseError {
            message: format!("invalid sport column: {e}"),
        })?;

        let monitored_parts: serde_json::Value = row.try_get("monitored_parts")?;
        let monitored_parts =
            serde_json::from_value(monitored_parts).map_err(|e| ArenarrError::DatabaseError {
                message: format!("invalid monitored_parts: {e}"),
            })?;

        let monitored_sessions: Option<serde_json::Value> = row.try_get("monitored_sessions")?;
        let monitored_sessions = monitored_sessions
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ArenarrError::DatabaseError {
                message: format!("invalid monitored_sessions: {e}"),
            })?;

        let tags: serde_json::Value = row.try_get("tags")?;
        let tags = serde_json::from_value(tags).map_err(|e| ArenarrError::DatabaseError {
            message: format!("invalid tags: {e}"),
        })?;

        Ok(Event {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            league_id: row.try_get("league_id")?,
            sport,
            sport_prefix: row.try_get("sport_prefix")?,
            event_date: row.try_get("event_date")?,
            season: row.try_get("season")?,
            round: row.try_get::<Option<i32>, _>("round")?.map(|r| r as u32),
            episode_number: row.try_get("episode_number")?,
            runtime_mins: row.try_get("runtime_mins")?,
            home_team: row.try_get("home_team")?,
            away_team: row.try_get("away_team")?,
            location: row.try_get("location")?,
            monitored: row.try_get("monitored")?,
            has_file: row.try_get("has_file")?,
            quality_profile_id: row.try_get("quality_profile_id")?,
            monitored_parts,
            monitored_sessions,
            tags,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            last_search_time: row.try_get("last_search_time")?,
        })
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| Self::row_to_event(&row)).transpose()
    }

    async fn find_monitored(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT * FROM events WHERE monitored AND league_id IS NOT NULL ORDER BY event_date",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_event).collect()
    }

    async fn create(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (
                id, title, league_id, sport, sport_prefix, event_date, season, round,
                episode_number, runtime_mins, home_team, away_team, location, monitored,
                has_file, quality_profile_id, monitored_parts, monitored_sessions, tags,
                created_at, updated_at, last_search_time
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22
            )
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(event.league_id)
        .bind(event.sport.to_string())
        .bind(&event.sport_prefix)
        .bind(event.event_date)
        .bind(event.season)
        .bind(event.round.map(|r| r as i32))
        .bind(event.episode_number)
        .bind(event.runtime_mins)
        .bind(&event.home_team)
        .bind(&event.away_team)
        .bind(&event.location)
        .bind(event.monitored)
        .bind(event.has_file)
        .bind(event.quality_profile_id)
        .bind(serde_json::to_value(&event.monitored_parts).unwrap_or_default())
        .bind(
            event
                .monitored_sessions
                .as_ref()
                .map(|s| serde_json::to_value(s).unwrap_or_default()),
        )
        .bind(serde_json::to_value(&event.tags).unwrap_or_default())
        .bind(event.created_at)
        .bind(event.updated_at)
        .bind(event.last_search_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE events SET
                title = $2, league_id = $3, sport = $4, sport_prefix = $5, event_date = $6,
                season = $7, round = $8, episode_number = $9, runtime_mins = $10,
                home_team = $11, away_team = $12, location = $13, monitored = $14,
                has_file = $15, quality_profile_id = $16, monitored_parts = $17,
                monitored_sessions = $18, tags = $19, updated_at = $20,
                last_search_time = $21
            WHERE id = $1
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(event.league_id)
        .bind(event.sport.to_string())
        .bind(&event.sport_prefix)
        .bind(event.event_date)
        .bind(event.season)
        .bind(event.round.map(|r| r as i32))
        .bind(event.episode_number)
        .bind(event.runtime_mins)
        .bind(&event.home_team)
        .bind(&event.away_team)
        .bind(&event.location)
        .bind(event.monitored)
        .bind(event.has_file)
        .bind(event.quality_profile_id)
        .bind(serde_json::to_value(&event.monitored_parts).unwrap_or_default())
        .bind(
            event
                .monitored_sessions
                .as_ref()
                .map(|s| serde_json::to_value(s).unwrap_or_default()),
        )
        .bind(serde_json::to_value(&event.tags).unwrap_or_default())
        .bind(event.updated_at)
        .bind(event.last_search_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_last_search_time(&self, id: Uuid, when: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE events SET last_search_time = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(when)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// PostgreSQL implementation of `EventFileRepository`
pub struct PostgresEventFileRepository {
    pool: PgPool,
}

impl PostgresEventFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_file(row: &sqlx::postgres::PgRow) -> Result<EventFile> {
        Ok(EventFile {
            id: row.try_get("id")?,
            event_id: row.try_get("event_id")?,
            file_path: row.try_get("file_path")?,
            size_bytes: row.try_get("size_bytes")?,
            quality: row.try_get("quality")?,
            part_name: row.try_get("part_name")?,
            part_number: row.try_get("part_number")?,
            added: row.try_get("added")?,
            last_verified: row.try_get("last_verified")?,
            exists: row.try_get("file_exists")?,
        })
    }
}

#[async_trait]
impl EventFileRepository for PostgresEventFileRepository {
    async fn add(&self, file: &EventFile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO event_files (
                id, event_id, file_path, size_bytes, quality, part_name, part_number,
                added, last_verified, file_exists
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(file.id)
        .bind(file.event_id)
        .bind(&file.file_path)
        .bind(file.size_bytes)
        .bind(&file.quality)
        .bind(&file.part_name)
        .bind(file.part_number)
        .bind(file.added)
        .bind(file.last_verified)
        .bind(file.exists)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_event(&self, event_id: Uuid) -> Result<Vec<EventFile>> {
        let rows = sqlx::query("SELECT * FROM event_files WHERE event_id = $1 ORDER BY added")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_file).collect()
    }

    async fn set_exists(&self, id: Uuid, exists: bool, verified: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE event_files SET file_exists = $2, last_verified = $3 WHERE id = $1")
            .bind(id)
            .bind(exists)
            .bind(verified)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM event_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

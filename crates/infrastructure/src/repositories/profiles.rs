//! Quality profile, custom format and delay profile repositories
//!
//! Profile item lists and format specifications are tagged-variant serde
//! structures stored as JSONB.

use arenarr_core::domain::repositories::{
    CustomFormatRepository, DelayProfileRepository, QualityProfileRepository,
};
use arenarr_core::models::custom_format::CustomFormat;
use arenarr_core::models::delay_profile::DelayProfile;
use arenarr_core::models::quality::QualityProfile;
use arenarr_core::models::release::ReleaseProtocol;
use arenarr_core::{ArenarrError, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::str::FromStr;

fn json_column<T: serde::de::DeserializeOwned>(
    row: &sqlx::postgres::PgRow,
    column: &str,
) -> Result<T> {
    let value: serde_json::Value = row.try_get(column)?;
    serde_json::from_value(value).map_err(|e| ArenarrError::DatabaseError {
        message: format!("invalid {column}: {e}"),
    })
}

/// PostgreSQL implementation of `QualityProfileRepository`
pub struct PostgresQualityProfileRepository {
    pool: PgPool,
}

impl PostgresQualityProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_profile(row: &sqlx::postgres::PgRow) -> Result<QualityProfile> {
        Ok(QualityProfile {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            items: json_column(row, "items")?,
            format_items: json_column(row, "format_items")?,
            minimum_quality_id: row.try_get("minimum_quality_id")?,
            cutoff_quality_id: row.try_get("cutoff_quality_id")?,
            upgrade_allowed: row.try_get("upgrade_allowed")?,
            min_format_score: row.try_get("min_format_score")?,
            preferred_size_mb_per_min: row.try_get("preferred_size_mb_per_min")?,
            size_limit_min_mb_per_min: row.try_get("size_limit_min_mb_per_min")?,
            size_limit_max_mb_per_min: row.try_get("size_limit_max_mb_per_min")?,
        })
    }
}

#[async_trait]
impl QualityProfileRepository for PostgresQualityProfileRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<QualityProfile>> {
        let row = sqlx::query("SELECT * FROM quality_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| Self::row_to_profile(&row)).transpose()
    }

    async fn list(&self) -> Result<Vec<QualityProfile>> {
        let rows = sqlx::query("SELECT * FROM quality_profiles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_profile).collect()
    }
}

/// PostgreSQL implementation of `CustomFormatRepository`
pub struct PostgresCustomFormatRepository {
    pool: PgPool,
}

impl PostgresCustomFormatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomFormatRepository for PostgresCustomFormatRepository {
    async fn list(&self) -> Result<Vec<CustomFormat>> {
        let rows = sqlx::query("SELECT * FROM custom_formats ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(CustomFormat {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    specifications: json_column(row, "specifications")?,
                })
            })
            .collect()
    }
}

/// PostgreSQL implementation of `DelayProfileRepository`
pub struct PostgresDelayProfileRepository {
    pool: PgPool,
}

impl PostgresDelayProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DelayProfileRepository for PostgresDelayProfileRepository {
    async fn list(&self) -> Result<Vec<DelayProfile>> {
        let rows = sqlx::query("SELECT * FROM delay_profiles ORDER BY profile_order")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let protocol_str: String = row.try_get("preferred_protocol")?;
                let preferred_protocol = ReleaseProtocol::from_str(&protocol_str).map_err(|e| {
                    ArenarrError::DatabaseError {
                        message: format!("invalid preferred protocol: {e}"),
                    }
                })?;
                Ok(DelayProfile {
                    id: row.try_get("id")?,
                    order: row.try_get("profile_order")?,
                    preferred_protocol,
                    usenet_delay_mins: row.try_get("usenet_delay_mins")?,
                    torrent_delay_mins: row.try_get("torrent_delay_mins")?,
                    bypass_if_highest_quality: row.try_get("bypass_if_highest_quality")?,
                    bypass_if_above_custom_format_score: row
                        .try_get("bypass_if_above_custom_format_score")?,
                    minimum_custom_format_score: row.try_get("minimum_custom_format_score")?,
                    tags: json_column(row, "tags")?,
                })
            })
            .collect()
    }
}

//! Download client and media-management settings repositories

use arenarr_core::domain::repositories::{DownloadClientRepository, MediaManagementRepository};
use arenarr_core::models::download_client::{DownloadClientConfig, DownloadClientKind};
use arenarr_core::models::library::{RemotePathMapping, RootFolder};
use arenarr_core::{ArenarrError, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::str::FromStr;

/// PostgreSQL implementation of `DownloadClientRepository`
pub struct PostgresDownloadClientRepository {
    pool: PgPool,
}

impl PostgresDownloadClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DownloadClientRepository for PostgresDownloadClientRepository {
    async fn list_enabled(&self) -> Result<Vec<DownloadClientConfig>> {
        let rows = sqlx::query("SELECT * FROM download_clients WHERE enabled ORDER BY priority")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let kind_str: String = row.try_get("kind")?;
                let kind = DownloadClientKind::from_str(&kind_str).map_err(|e| {
                    ArenarrError::DatabaseError {
                        message: format!("invalid download client kind: {e}"),
                    }
                })?;
                Ok(DownloadClientConfig {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    kind,
                    enabled: row.try_get("enabled")?,
                    priority: row.try_get("priority")?,
                    host: row.try_get("host")?,
                    port: row.try_get::<i32, _>("port")? as u16,
                    use_ssl: row.try_get("use_ssl")?,
                    username: row.try_get("username")?,
                    password: row.try_get("password")?,
                    api_key: row.try_get("api_key")?,
                    category: row.try_get("category")?,
                    created_at: row.try_get("created_at")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }
}

/// PostgreSQL implementation of `MediaManagementRepository`
pub struct PostgresMediaManagementRepository {
    pool: PgPool,
}

impl PostgresMediaManagementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaManagementRepository for PostgresMediaManagementRepository {
    async fn list_root_folders(&self) -> Result<Vec<RootFolder>> {
        let rows = sqlx::query("SELECT * FROM root_folders ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(RootFolder {
                    id: row.try_get("id")?,
                    path: row.try_get("path")?,
                })
            })
            .collect()
    }

    async fn list_remote_path_mappings(&self) -> Result<Vec<RemotePathMapping>> {
        let rows = sqlx::query("SELECT * FROM remote_path_mappings ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(RemotePathMapping {
                    id: row.try_get("id")?,
                    host: row.try_get("host")?,
                    remote_path: row.try_get("remote_path")?,
                    local_path: row.try_get("local_path")?,
                })
            })
            .collect()
    }
}

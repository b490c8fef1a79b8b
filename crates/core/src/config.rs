//! Application configuration
//!
//! One JSON document at `{data_path}/config.json`. Saves are atomic: the new
//! document is written to a temp file and renamed over the old one, keeping
//! one `.bak` copy of the previous version.

use crate::error::{ArenarrError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Bounds for the RSS sync interval in minutes.
pub const RSS_INTERVAL_MIN: u32 = 10;
pub const RSS_INTERVAL_MAX: u32 = 120;

/// Root configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bearer token for the management surface
    pub api_key: String,
    pub database_url: String,
    /// Requested RSS sync interval in minutes; clamped to 10..=120 at use
    pub rss_sync_interval_mins: u32,
    pub max_rss_releases_per_indexer: u32,
    pub rss_release_age_limit_days: u32,
    pub enable_multi_part_episodes: bool,
    pub data_path: PathBuf,
    pub minimum_free_space_mb: u64,
    pub use_hardlinks: bool,
    pub skip_free_space_check: bool,
    /// Delete the source download (and empty parents) after import
    pub recycle_after_import: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            database_url: "postgres://localhost/arenarr".to_string(),
            rss_sync_interval_mins: 15,
            max_rss_releases_per_indexer: 500,
            rss_release_age_limit_days: 14,
            enable_multi_part_episodes: false,
            data_path: PathBuf::from("/var/lib/arenarr"),
            minimum_free_space_mb: 100,
            use_hardlinks: true,
            skip_free_space_check: false,
            recycle_after_import: false,
        }
    }
}

impl AppConfig {
    /// RSS interval with the documented clamp applied.
    pub fn effective_rss_interval_mins(&self) -> u32 {
        self.rss_sync_interval_mins
            .clamp(RSS_INTERVAL_MIN, RSS_INTERVAL_MAX)
    }

    /// Load configuration from `path`. A missing file yields defaults; an
    /// unreadable or unparseable file is a startup error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file missing, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(ArenarrError::ConfigurationError {
                    field: path.display().to_string(),
                    message: format!("failed to read config: {err}"),
                })
            }
        };

        let config: AppConfig =
            serde_json::from_str(&raw).map_err(|err| ArenarrError::ConfigurationError {
                field: path.display().to_string(),
                message: format!("invalid config document: {err}"),
            })?;

        if config.rss_sync_interval_mins != config.effective_rss_interval_mins() {
            warn!(
                requested = config.rss_sync_interval_mins,
                effective = config.effective_rss_interval_mins(),
                "rss sync interval outside bounds, clamping"
            );
        }

        Ok(config)
    }

    /// Persist atomically: write `path.tmp`, move the current file to
    /// `path.bak`, rename the temp file into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized =
            serde_json::to_string_pretty(self).map_err(|err| ArenarrError::ConfigurationError {
                field: path.display().to_string(),
                message: format!("failed to serialize config: {err}"),
            })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| ArenarrError::FileSystemError {
                path: parent.display().to_string(),
                error: err.to_string(),
            })?;
        }

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serialized).map_err(|err| ArenarrError::FileSystemError {
            path: tmp_path.display().to_string(),
            error: err.to_string(),
        })?;

        if path.exists() {
            let backup = path.with_extension("json.bak");
            std::fs::copy(path, &backup).map_err(|err| ArenarrError::FileSystemError {
                path: backup.display().to_string(),
                error: err.to_string(),
            })?;
        }

        std::fs::rename(&tmp_path, path).map_err(|err| ArenarrError::FileSystemError {
            path: path.display().to_string(),
            error: err.to_string(),
        })?;

        Ok(())
    }
}

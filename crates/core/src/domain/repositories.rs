//! Domain repositories
//!
//! Repository traits abstracting persistence for domain entities. The
//! database is the source of truth; concrete implementations live in the
//! infrastructure crate.

use crate::error::Result;
use crate::models::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Repository for monitored events
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;

    /// All monitored events belonging to a league
    async fn find_monitored(&self) -> Result<Vec<Event>>;

    async fn create(&self, event: &Event) -> Result<()>;

    async fn update(&self, event: &Event) -> Result<()>;

    async fn update_last_search_time(&self, id: Uuid, when: DateTime<Utc>) -> Result<()>;
}

/// Repository for files owned by events
#[async_trait]
pub trait EventFileRepository: Send + Sync {
    async fn add(&self, file: &EventFile) -> Result<()>;

    async fn find_by_event(&self, event_id: Uuid) -> Result<Vec<EventFile>>;

    async fn set_exists(&self, id: Uuid, exists: bool, verified: DateTime<Utc>) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Persistent, guid-keyed store of recently-seen releases
#[async_trait]
pub trait ReleaseCacheRepository: Send + Sync {
    /// Upsert a batch, de-duplicated by guid. Existing rows get their
    /// seeders/leechers/TTL refreshed, never their identity fields.
    /// Returns the number of rows written.
    async fn upsert_batch(&self, releases: &[CachedRelease]) -> Result<usize>;

    /// Non-expired candidates pre-filtered by sport prefix and year,
    /// newest first.
    async fn find_candidates(
        &self,
        sport_prefix: Option<&str>,
        year: Option<i32>,
        limit: i64,
    ) -> Result<Vec<CachedRelease>>;

    /// All-terms-must-occur lookup over normalized title and search terms.
    async fn find_by_query(&self, terms: &[String], max: i64) -> Result<Vec<CachedRelease>>;

    /// Bulk-delete entries past their TTL. Returns the number removed.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn count(&self) -> Result<i64>;
}

/// Repository for the download queue
#[async_trait]
pub trait QueueRepository: Send + Sync {
    async fn add(&self, item: &DownloadQueueItem) -> Result<()>;

    async fn update(&self, item: &DownloadQueueItem) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DownloadQueueItem>>;

    /// All items in non-terminal states
    async fn find_active(&self) -> Result<Vec<DownloadQueueItem>>;

    async fn find_by_event(&self, event_id: Uuid) -> Result<Vec<DownloadQueueItem>>;

    /// Most recent failed item for an event and info hash, used for
    /// retry backoff checks
    async fn find_latest_failed(
        &self,
        event_id: Uuid,
        torrent_info_hash: &str,
    ) -> Result<Option<DownloadQueueItem>>;

    /// Count of failed attempts for an info hash across the event's history
    async fn count_failures(&self, event_id: Uuid, torrent_info_hash: &str) -> Result<i64>;

    /// Delete terminal items older than the grace period. Returns removals.
    async fn remove_stale(&self, older_than: DateTime<Utc>) -> Result<u64>;
}

/// Repository for indexer configuration and health
#[async_trait]
pub trait IndexerRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Indexer>>;

    async fn list_enabled(&self) -> Result<Vec<Indexer>>;

    async fn load_statuses(&self) -> Result<Vec<IndexerStatusRecord>>;

    async fn save_status(&self, status: &IndexerStatusRecord) -> Result<()>;
}

/// Repository for quality profiles
#[async_trait]
pub trait QualityProfileRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<QualityProfile>>;

    async fn list(&self) -> Result<Vec<QualityProfile>>;
}

/// Repository for custom formats
#[async_trait]
pub trait CustomFormatRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<CustomFormat>>;
}

/// Repository for delay profiles
#[async_trait]
pub trait DelayProfileRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<DelayProfile>>;
}

/// Repository for the blocklist
#[async_trait]
pub trait BlocklistRepository: Send + Sync {
    async fn add(&self, item: &BlocklistItem) -> Result<()>;

    async fn contains(&self, event_id: Uuid, torrent_info_hash: &str) -> Result<bool>;
}

/// Repository for import history
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn record(&self, history: &ImportHistory) -> Result<()>;
}

/// Repository for download client configuration
#[async_trait]
pub trait DownloadClientRepository: Send + Sync {
    async fn list_enabled(&self) -> Result<Vec<DownloadClientConfig>>;
}

/// Repository for media-management settings
#[async_trait]
pub trait MediaManagementRepository: Send + Sync {
    async fn list_root_folders(&self) -> Result<Vec<RootFolder>>;

    async fn list_remote_path_mappings(&self) -> Result<Vec<RemotePathMapping>>;
}

//! In-memory repository fakes shared by the integration tests

use arenarr::jobs::ReleaseSource;
use arenarr_core::domain::repositories::*;
use arenarr_core::models::blocklist::BlocklistItem;
use arenarr_core::models::custom_format::CustomFormat;
use arenarr_core::models::delay_profile::DelayProfile;
use arenarr_core::models::download_client::DownloadClientConfig;
use arenarr_core::models::event::{Event, EventFile};
use arenarr_core::models::library::{ImportHistory, RemotePathMapping, RootFolder};
use arenarr_core::models::quality::QualityProfile;
use arenarr_core::models::queue::{DownloadQueueItem, QueueStatus};
use arenarr_core::models::release::{CachedRelease, ReleaseSearchResult};
use arenarr_core::Result;
use arenarr_downloaders::{
    AddDownloadResult, DownloadClient, DownloadClientStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryEvents {
    pub events: Mutex<HashMap<Uuid, Event>>,
}

impl InMemoryEvents {
    pub fn seed(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events.into_iter().map(|e| (e.id, e)).collect()),
        }
    }
}

#[async_trait]
impl EventRepository for InMemoryEvents {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.events.lock().unwrap().get(&id).cloned())
    }

    async fn find_monitored(&self) -> Result<Vec<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.monitored && e.league_id.is_some())
            .cloned()
            .collect())
    }

    async fn create(&self, event: &Event) -> Result<()> {
        self.events.lock().unwrap().insert(event.id, event.clone());
        Ok(())
    }

    async fn update(&self, event: &Event) -> Result<()> {
        self.events.lock().unwrap().insert(event.id, event.clone());
        Ok(())
    }

    async fn update_last_search_time(&self, id: Uuid, when: DateTime<Utc>) -> Result<()> {
        if let Some(event) = self.events.lock().unwrap().get_mut(&id) {
            event.last_search_time = Some(when);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEventFiles {
    pub files: Mutex<Vec<EventFile>>,
}

#[async_trait]
impl EventFileRepository for InMemoryEventFiles {
    async fn add(&self, file: &EventFile) -> Result<()> {
        self.files.lock().unwrap().push(file.clone());
        Ok(())
    }

    async fn find_by_event(&self, event_id: Uuid) -> Result<Vec<EventFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn set_exists(&self, id: Uuid, exists: bool, verified: DateTime<Utc>) -> Result<()> {
        if let Some(file) = self.files.lock().unwrap().iter_mut().find(|f| f.id == id) {
            file.exists = exists;
            file.last_verified = Some(verified);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.files.lock().unwrap().retain(|f| f.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReleaseCache {
    pub rows: Mutex<HashMap<String, CachedRelease>>,
}

#[async_trait]
impl ReleaseCacheRepository for InMemoryReleaseCache {
    async fn upsert_batch(&self, releases: &[CachedRelease]) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        for release in releases {
            match rows.get_mut(&release.guid) {
                Some(existing) => {
                    existing.seeders = release.seeders;
                    existing.leechers = release.leechers;
                    existing.last_seen = release.last_seen;
                    existing.expires_at = release.expires_at;
                }
                None => {
                    rows.insert(release.guid.clone(), release.clone());
                }
            }
        }
        Ok(releases.len())
    }

    async fn find_candidates(
        &self,
        sport_prefix: Option<&str>,
        year: Option<i32>,
        limit: i64,
    ) -> Result<Vec<CachedRelease>> {
        let now = Utc::now();
        let mut matches: Vec<CachedRelease> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| !r.is_expired(now))
            .filter(|r| sport_prefix.map(|p| r.sport_prefix.as_deref() == Some(p)).unwrap_or(true))
            .filter(|r| year.map(|y| r.year == Some(y)).unwrap_or(true))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn find_by_query(&self, terms: &[String], max: i64) -> Result<Vec<CachedRelease>> {
        let mut matches: Vec<CachedRelease> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                terms.iter().all(|term| {
                    let term = term.to_lowercase();
                    r.normalized_title.contains(&term)
                        || r.search_terms.iter().any(|t| t.contains(&term))
                })
            })
            .cloned()
            .collect();
        matches.truncate(max as usize);
        Ok(matches)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, r| !r.is_expired(now));
        Ok((before - rows.len()) as u64)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryQueue {
    pub items: Mutex<Vec<DownloadQueueItem>>,
}

#[async_trait]
impl QueueRepository for InMemoryQueue {
    async fn add(&self, item: &DownloadQueueItem) -> Result<()> {
        self.items.lock().unwrap().push(item.clone());
        Ok(())
    }

    async fn update(&self, item: &DownloadQueueItem) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        if let Some(existing) = items.iter_mut().find(|i| i.id == item.id) {
            *existing = item.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DownloadQueueItem>> {
        Ok(self.items.lock().unwrap().iter().find(|i| i.id == id).cloned())
    }

    async fn find_active(&self) -> Result<Vec<DownloadQueueItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| !i.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn find_by_event(&self, event_id: Uuid) -> Result<Vec<DownloadQueueItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn find_latest_failed(
        &self,
        event_id: Uuid,
        torrent_info_hash: &str,
    ) -> Result<Option<DownloadQueueItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| {
                i.event_id == event_id
                    && i.status == QueueStatus::Failed
                    && i.release.torrent_info_hash.as_deref() == Some(torrent_info_hash)
            })
            .max_by_key(|i| i.last_update)
            .cloned())
    }

    async fn count_failures(&self, event_id: Uuid, torrent_info_hash: &str) -> Result<i64> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| {
                i.event_id == event_id
                    && i.status == QueueStatus::Failed
                    && i.release.torrent_info_hash.as_deref() == Some(torrent_info_hash)
            })
            .count() as i64)
    }

    async fn remove_stale(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|i| !(i.status.is_terminal() && i.last_update < older_than));
        Ok((before - items.len()) as u64)
    }
}

pub struct StaticProfiles(pub Vec<QualityProfile>);

#[async_trait]
impl QualityProfileRepository for StaticProfiles {
    async fn find_by_id(&self, id: i32) -> Result<Option<QualityProfile>> {
        Ok(self.0.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<QualityProfile>> {
        Ok(self.0.clone())
    }
}

pub struct StaticFormats(pub Vec<CustomFormat>);

#[async_trait]
impl CustomFormatRepository for StaticFormats {
    async fn list(&self) -> Result<Vec<CustomFormat>> {
        Ok(self.0.clone())
    }
}

pub struct StaticDelayProfiles(pub Vec<DelayProfile>);

#[async_trait]
impl DelayProfileRepository for StaticDelayProfiles {
    async fn list(&self) -> Result<Vec<DelayProfile>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct InMemoryBlocklist {
    pub items: Mutex<Vec<BlocklistItem>>,
}

#[async_trait]
impl BlocklistRepository for InMemoryBlocklist {
    async fn add(&self, item: &BlocklistItem) -> Result<()> {
        self.items.lock().unwrap().push(item.clone());
        Ok(())
    }

    async fn contains(&self, event_id: Uuid, torrent_info_hash: &str) -> Result<bool> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .any(|i| i.event_id == event_id && i.torrent_info_hash == torrent_info_hash))
    }
}

#[derive(Default)]
pub struct InMemoryHistory {
    pub records: Mutex<Vec<ImportHistory>>,
}

#[async_trait]
impl HistoryRepository for InMemoryHistory {
    async fn record(&self, history: &ImportHistory) -> Result<()> {
        self.records.lock().unwrap().push(history.clone());
        Ok(())
    }
}

pub struct StaticMedia {
    pub roots: Vec<RootFolder>,
    pub mappings: Vec<RemotePathMapping>,
}

#[async_trait]
impl MediaManagementRepository for StaticMedia {
    async fn list_root_folders(&self) -> Result<Vec<RootFolder>> {
        Ok(self.roots.clone())
    }

    async fn list_remote_path_mappings(&self) -> Result<Vec<RemotePathMapping>> {
        Ok(self.mappings.clone())
    }
}

/// Programmable RSS feed
pub struct StubReleaseSource {
    pub releases: Mutex<Vec<ReleaseSearchResult>>,
}

impl StubReleaseSource {
    pub fn new(releases: Vec<ReleaseSearchResult>) -> Self {
        Self {
            releases: Mutex::new(releases),
        }
    }
}

#[async_trait]
impl ReleaseSource for StubReleaseSource {
    async fn fetch_all_rss(&self, _per_indexer_limit: u32) -> Result<Vec<ReleaseSearchResult>> {
        Ok(self.releases.lock().unwrap().clone())
    }
}

/// Download client whose adds always succeed and whose statuses are
/// programmable per download id.
pub struct ScriptedDownloadClient {
    pub config: DownloadClientConfig,
    pub added: Mutex<Vec<String>>,
    pub statuses: Mutex<HashMap<String, DownloadClientStatus>>,
}

impl ScriptedDownloadClient {
    pub fn new(config: DownloadClientConfig) -> Self {
        Self {
            config,
            added: Mutex::new(Vec::new()),
            statuses: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_status(&self, download_id: &str, status: DownloadClientStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(download_id.to_string(), status);
    }
}

#[async_trait]
impl DownloadClient for ScriptedDownloadClient {
    fn config(&self) -> &DownloadClientConfig {
        &self.config
    }

    async fn add_download(
        &self,
        url: &str,
        _category: &str,
        _expected_name: Option<&str>,
    ) -> Result<AddDownloadResult> {
        self.added.lock().unwrap().push(url.to_string());
        Ok(AddDownloadResult::ok(Some(format!(
            "dl-{}",
            self.added.lock().unwrap().len()
        ))))
    }

    async fn get_status(&self, download_id: &str) -> Result<Option<DownloadClientStatus>> {
        Ok(self.statuses.lock().unwrap().get(download_id).cloned())
    }

    async fn find_by_title(
        &self,
        _title: &str,
        _category: &str,
    ) -> Result<Option<(DownloadClientStatus, String)>> {
        Ok(None)
    }

    async fn remove(&self, _download_id: &str, _delete_files: bool) -> Result<()> {
        Ok(())
    }

    async fn test(&self) -> Result<bool> {
        Ok(true)
    }
}

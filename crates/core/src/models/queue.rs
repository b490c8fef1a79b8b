//! Download queue domain model
//!
//! A `DownloadQueueItem` is the durable state of one in-flight acquisition,
//! driven through its state machine by the download monitor.

use super::release::{ReleaseProtocol, ReleaseSearchResult};
use crate::error::{ArenarrError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical status of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QueueStatus {
    #[default]
    Queued,
    Downloading,
    Paused,
    /// Downloading but unhealthy (stalled, missing metadata)
    Warning,
    Completed,
    Importing,
    Imported,
    Failed,
}

impl QueueStatus {
    /// Terminal states are never left and are reaped after a grace period.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Imported | QueueStatus::Failed)
    }

    /// Valid transitions of the queue state machine.
    pub fn can_transition_to(&self, next: QueueStatus) -> bool {
        use QueueStatus::*;
        if *self == next {
            return true;
        }
        match self {
            Queued => matches!(next, Downloading | Paused | Warning | Completed | Failed),
            Downloading => matches!(next, Paused | Warning | Completed | Failed),
            Paused => matches!(next, Downloading | Failed),
            Warning => matches!(next, Downloading | Paused | Completed | Failed),
            Completed => matches!(next, Importing | Failed),
            Importing => matches!(next, Imported | Failed),
            Imported | Failed => false,
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Queued => write!(f, "queued"),
            QueueStatus::Downloading => write!(f, "downloading"),
            QueueStatus::Paused => write!(f, "paused"),
            QueueStatus::Warning => write!(f, "warning"),
            QueueStatus::Completed => write!(f, "completed"),
            QueueStatus::Importing => write!(f, "importing"),
            QueueStatus::Imported => write!(f, "imported"),
            QueueStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queued" => Ok(QueueStatus::Queued),
            "downloading" => Ok(QueueStatus::Downloading),
            "paused" => Ok(QueueStatus::Paused),
            "warning" => Ok(QueueStatus::Warning),
            "completed" => Ok(QueueStatus::Completed),
            "importing" => Ok(QueueStatus::Importing),
            "imported" => Ok(QueueStatus::Imported),
            "failed" => Ok(QueueStatus::Failed),
            other => Err(format!("unknown queue status: '{other}'")),
        }
    }
}

/// Subset of the chosen release persisted with the queue item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSnapshot {
    pub title: String,
    pub guid: String,
    pub indexer_id: i32,
    pub indexer: String,
    pub download_url: String,
    pub protocol: ReleaseProtocol,
    pub torrent_info_hash: Option<String>,
    pub size_bytes: Option<i64>,
    pub quality: Option<String>,
    pub part: Option<String>,
}

impl From<&ReleaseSearchResult> for ReleaseSnapshot {
    fn from(release: &ReleaseSearchResult) -> Self {
        Self {
            title: release.title.clone(),
            guid: release.guid.clone(),
            indexer_id: release.indexer_id,
            indexer: release.indexer.clone(),
            download_url: release.download_url.clone(),
            protocol: release.protocol,
            torrent_info_hash: release.torrent_info_hash.clone(),
            size_bytes: release.size_bytes,
            quality: release.quality.clone(),
            part: release.part.map(|p| p.name().to_string()),
        }
    }
}

/// Retry backoff after a failed grab, indexed by retry count.
const GRAB_RETRY_BACKOFF_MINS: [i64; 5] = [30, 60, 120, 240, 480];

/// Backoff before re-grabbing for an event, saturating at the table's end.
pub fn grab_retry_backoff(retry_count: u32) -> Duration {
    let idx = (retry_count as usize).min(GRAB_RETRY_BACKOFF_MINS.len() - 1);
    Duration::minutes(GRAB_RETRY_BACKOFF_MINS[idx])
}

/// Durable state for one in-flight acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadQueueItem {
    pub id: Uuid,
    pub event_id: Uuid,
    pub release: ReleaseSnapshot,
    pub download_client_id: i32,
    /// Vendor-opaque id (torrent hash, NZB id); set after dispatch
    pub download_id: Option<String>,
    pub status: QueueStatus,
    /// 0.0 to 100.0
    pub progress: f64,
    pub downloaded_bytes: Option<i64>,
    pub size_bytes: Option<i64>,
    pub time_remaining_secs: Option<i64>,
    pub retry_count: u32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl DownloadQueueItem {
    pub fn new(event_id: Uuid, release: ReleaseSnapshot, download_client_id: i32) -> Self {
        let now = Utc::now();
        let size_bytes = release.size_bytes;
        Self {
            id: Uuid::new_v4(),
            event_id,
            release,
            download_client_id,
            download_id: None,
            status: QueueStatus::Queued,
            progress: 0.0,
            downloaded_bytes: None,
            size_bytes,
            time_remaining_secs: None,
            retry_count: 0,
            error_message: None,
            created_at: now,
            last_update: now,
        }
    }

    /// Move to `next`, rejecting transitions the state machine forbids.
    pub fn transition_to(&mut self, next: QueueStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ArenarrError::ValidationError {
                field: "status".to_string(),
                message: format!("invalid queue transition {} -> {}", self.status, next),
            });
        }
        self.status = next;
        self.last_update = Utc::now();
        if next == QueueStatus::Completed || next == QueueStatus::Imported {
            self.progress = 100.0;
        }
        Ok(())
    }

    pub fn fail(&mut self, message: String) {
        self.status = QueueStatus::Failed;
        self.error_message = Some(message);
        self.last_update = Utc::now();
    }

    pub fn update_progress(
        &mut self,
        progress: f64,
        downloaded_bytes: Option<i64>,
        size_bytes: Option<i64>,
        time_remaining_secs: Option<i64>,
    ) {
        self.progress = progress.clamp(0.0, 100.0);
        self.downloaded_bytes = downloaded_bytes;
        if size_bytes.is_some() {
            self.size_bytes = size_bytes;
        }
        self.time_remaining_secs = time_remaining_secs;
        self.last_update = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ReleaseSnapshot {
        ReleaseSnapshot {
            title: "UFC.310.2024.1080p.WEB-DL-GRP".to_string(),
            guid: "guid-1".to_string(),
            indexer_id: 1,
            indexer: "mock".to_string(),
            download_url: "http://example.test/dl".to_string(),
            protocol: ReleaseProtocol::Torrent,
            torrent_info_hash: Some("abc123".to_string()),
            size_bytes: Some(4_000_000_000),
            quality: Some("WEBDL-1080p".to_string()),
            part: None,
        }
    }

    #[test]
    fn happy_path_transitions() {
        let mut item = DownloadQueueItem::new(Uuid::new_v4(), snapshot(), 1);
        for next in [
            QueueStatus::Downloading,
            QueueStatus::Completed,
            QueueStatus::Importing,
            QueueStatus::Imported,
        ] {
            item.transition_to(next).unwrap();
        }
        assert_eq!(item.status, QueueStatus::Imported);
        assert_eq!(item.progress, 100.0);
        assert!(!item.is_active());
    }

    #[test]
    fn terminal_states_reject_transitions() {
        let mut item = DownloadQueueItem::new(Uuid::new_v4(), snapshot(), 1);
        item.fail("torrent rejected".to_string());
        assert!(item.transition_to(QueueStatus::Queued).is_err());
        assert!(item.transition_to(QueueStatus::Downloading).is_err());
    }

    #[test]
    fn importing_failure_is_allowed() {
        let mut item = DownloadQueueItem::new(Uuid::new_v4(), snapshot(), 1);
        item.transition_to(QueueStatus::Downloading).unwrap();
        item.transition_to(QueueStatus::Completed).unwrap();
        item.transition_to(QueueStatus::Importing).unwrap();
        item.transition_to(QueueStatus::Failed).unwrap();
        assert_eq!(item.status, QueueStatus::Failed);
    }

    #[test]
    fn queued_cannot_jump_to_importing() {
        let mut item = DownloadQueueItem::new(Uuid::new_v4(), snapshot(), 1);
        assert!(item.transition_to(QueueStatus::Importing).is_err());
    }

    #[test]
    fn grab_backoff_saturates() {
        assert_eq!(grab_retry_backoff(0), Duration::minutes(30));
        assert_eq!(grab_retry_backoff(2), Duration::minutes(120));
        assert_eq!(grab_retry_backoff(4), Duration::minutes(480));
        assert_eq!(grab_retry_backoff(40), Duration::minutes(480));
    }
}

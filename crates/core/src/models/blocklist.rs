//! Blocklist of releases that must never be grabbed again

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One blocked release, keyed by event and torrent info hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocklistItem {
    pub id: Uuid,
    pub event_id: Uuid,
    pub torrent_info_hash: String,
    pub title: String,
    pub reason: String,
    pub added: DateTime<Utc>,
}

impl BlocklistItem {
    pub fn new(event_id: Uuid, torrent_info_hash: String, title: String, reason: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            torrent_info_hash,
            title,
            reason,
            added: Utc::now(),
        }
    }
}

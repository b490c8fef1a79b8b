//! Indexer health tracking
//!
//! In-memory health map over `IndexerStatusRecord`, mutated only by the
//! orchestrator's result handler and persisted best-effort through the
//! indexer repository. Readers see eventually-consistent values.

use arenarr_core::domain::repositories::IndexerRepository;
use arenarr_core::models::indexer::IndexerStatusRecord;
use arenarr_core::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Tracks per-indexer failure streaks, backoff windows and 429 cooldowns.
pub struct IndexerStatusTracker {
    statuses: RwLock<HashMap<i32, IndexerStatusRecord>>,
    repository: Option<Arc<dyn IndexerRepository>>,
}

impl IndexerStatusTracker {
    pub fn new() -> Self {
        Self {
            statuses: RwLock::new(HashMap::new()),
            repository: None,
        }
    }

    pub fn with_repository(repository: Arc<dyn IndexerRepository>) -> Self {
        Self {
            statuses: RwLock::new(HashMap::new()),
            repository: Some(repository),
        }
    }

    /// Load persisted statuses, replacing the in-memory map.
    pub async fn load(&self) -> Result<()> {
        let Some(repository) = &self.repository else {
            return Ok(());
        };
        let records = repository.load_statuses().await?;
        let mut statuses = self.statuses.write().await;
        statuses.clear();
        for record in records {
            statuses.insert(record.indexer_id, record);
        }
        Ok(())
    }

    /// Whether the indexer may be queried now, with a skip reason when not.
    pub async fn is_available(&self, indexer_id: i32, now: DateTime<Utc>) -> (bool, Option<String>) {
        let statuses = self.statuses.read().await;
        match statuses.get(&indexer_id) {
            Some(status) => status.is_available(now),
            None => (true, None),
        }
    }

    pub async fn record_success(&self, indexer_id: i32, now: DateTime<Utc>) {
        self.mutate(indexer_id, |status| status.record_success(now))
            .await;
    }

    pub async fn record_failure(&self, indexer_id: i32, error: String, now: DateTime<Utc>) {
        self.mutate(indexer_id, |status| status.record_failure(error, now))
            .await;
    }

    pub async fn record_rate_limit(&self, indexer_id: i32, retry_after_secs: u64, now: DateTime<Utc>) {
        self.mutate(indexer_id, |status| {
            status.record_rate_limit(retry_after_secs, now)
        })
        .await;
    }

    /// Current record for an indexer, if one exists yet.
    pub async fn snapshot(&self, indexer_id: i32) -> Option<IndexerStatusRecord> {
        self.statuses.read().await.get(&indexer_id).cloned()
    }

    async fn mutate(&self, indexer_id: i32, apply: impl FnOnce(&mut IndexerStatusRecord)) {
        let updated = {
            let mut statuses = self.statuses.write().await;
            let status = statuses
                .entry(indexer_id)
                .or_insert_with(|| IndexerStatusRecord::new(indexer_id));
            apply(status);
            status.clone()
        };

        if let Some(repository) = &self.repository {
            if let Err(error) = repository.save_status(&updated).await {
                warn!(indexer_id, %error, "failed to persist indexer status");
            }
        }
    }
}

impl Default for IndexerStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

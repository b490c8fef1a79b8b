//! Download monitor loop
//!
//! Polls the download clients for every non-terminal queue item, maps
//! vendor states onto the canonical queue state machine and hands completed
//! downloads to the importer. An import failure marks the item failed with
//! its reason; the download itself is left in place.

use arenarr_core::domain::repositories::{EventRepository, QueueRepository};
use arenarr_core::models::parsed::Part;
use arenarr_core::models::queue::{DownloadQueueItem, QueueStatus};
use arenarr_core::Result;
use arenarr_decision::infer_event_type;
use arenarr_downloaders::{DownloadClient, DownloadClientStatus, DownloadStatusKind};
use arenarr_import::{ImportPipeline, ImportRequest};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Monitor loop configuration
#[derive(Debug, Clone)]
pub struct DownloadMonitorConfig {
    pub interval: std::time::Duration,
    /// Terminal items older than this are reaped
    pub terminal_grace_hours: i64,
    pub enabled: bool,
}

impl Default for DownloadMonitorConfig {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(30),
            terminal_grace_hours: 72,
            enabled: true,
        }
    }
}

/// The download monitor background job
pub struct DownloadMonitorJob {
    config: DownloadMonitorConfig,
    clients: HashMap<i32, Arc<dyn DownloadClient>>,
    queue: Arc<dyn QueueRepository>,
    events: Arc<dyn EventRepository>,
    importer: Arc<ImportPipeline>,
}

impl DownloadMonitorJob {
    pub fn new(
        config: DownloadMonitorConfig,
        clients: Vec<Arc<dyn DownloadClient>>,
        queue: Arc<dyn QueueRepository>,
        events: Arc<dyn EventRepository>,
        importer: Arc<ImportPipeline>,
    ) -> Self {
        let clients = clients
            .into_iter()
            .map(|client| (client.config().id, client))
            .collect();
        Self {
            config,
            clients,
            queue,
            events,
            importer,
        }
    }

    pub async fn start(self: Arc<Self>) {
        if !self.config.enabled {
            info!("download monitor is disabled");
            return;
        }
        info!(interval = ?self.config.interval, "starting download monitor");

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(tick_error) = self.tick().await {
                error!(%tick_error, "download monitor tick failed");
            }
        }
    }

    /// Poll every active queue item once.
    pub async fn tick(&self) -> Result<usize> {
        let items = self.queue.find_active().await?;
        let mut updated = 0;

        for mut item in items {
            let Some(client) = self.clients.get(&item.download_client_id) else {
                warn!(
                    item = %item.release.title,
                    client_id = item.download_client_id,
                    "queue item references an unknown download client"
                );
                continue;
            };

            match self.poll_item(client, &mut item).await {
                Ok(changed) => {
                    if changed {
                        self.queue.update(&item).await?;
                        updated += 1;
                    }
                }
                Err(poll_error) => {
                    warn!(item = %item.release.title, %poll_error, "failed to poll download");
                }
            }
        }

        let grace = Utc::now() - Duration::hours(self.config.terminal_grace_hours);
        let reaped = self.queue.remove_stale(grace).await?;
        if reaped > 0 {
            debug!(reaped, "removed stale terminal queue items");
        }

        Ok(updated)
    }

    /// Update one item from its client; returns whether the item changed.
    async fn poll_item(
        &self,
        client: &Arc<dyn DownloadClient>,
        item: &mut DownloadQueueItem,
    ) -> Result<bool> {
        let status = match item.download_id.as_deref() {
            Some(download_id) => client.get_status(download_id).await?,
            None => None,
        };

        // Fallback for identity-shifting fronts: find the download by title
        let status = match status {
            Some(status) => Some(status),
            None => {
                let category = &client.config().category;
                match client.find_by_title(&item.release.title, category).await? {
                    Some((status, download_id)) => {
                        debug!(
                            item = %item.release.title,
                            %download_id,
                            "recovered download id by title"
                        );
                        item.download_id = Some(download_id);
                        Some(status)
                    }
                    None => None,
                }
            }
        };

        let Some(status) = status else {
            item.fail("download disappeared from client".to_string());
            return Ok(true);
        };

        item.update_progress(
            status.progress,
            status.downloaded_bytes,
            status.size_bytes,
            status.time_remaining_secs,
        );

        let target = match status.kind {
            DownloadStatusKind::Queued => QueueStatus::Queued,
            DownloadStatusKind::Downloading => QueueStatus::Downloading,
            DownloadStatusKind::Paused => QueueStatus::Paused,
            DownloadStatusKind::Warning => QueueStatus::Warning,
            DownloadStatusKind::Completed => QueueStatus::Completed,
            DownloadStatusKind::Failed => QueueStatus::Failed,
        };

        if target == QueueStatus::Failed {
            item.fail(
                status
                    .error
                    .unwrap_or_else(|| "download failed in client".to_string()),
            );
            return Ok(true);
        }

        if target != item.status {
            if let Err(transition_error) = item.transition_to(target) {
                debug!(
                    item = %item.release.title,
                    %transition_error,
                    "ignoring out-of-order vendor state"
                );
                return Ok(true);
            }
        }

        if item.status == QueueStatus::Completed {
            self.import_item(client, item, &status).await;
            return Ok(true);
        }

        Ok(true)
    }

    /// Drive a completed item through import. Failure moves the item to
    /// `Failed` with the reason and leaves the source download intact.
    async fn import_item(
        &self,
        client: &Arc<dyn DownloadClient>,
        item: &mut DownloadQueueItem,
        status: &DownloadClientStatus,
    ) {
        if let Err(transition_error) = item.transition_to(QueueStatus::Importing) {
            warn!(item = %item.release.title, %transition_error, "cannot start import");
            return;
        }

        let Some(save_path) = status.save_path.clone() else {
            item.fail("client reported no save path for completed download".to_string());
            return;
        };

        let event = match self.events.find_by_id(item.event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                item.fail("event no longer exists".to_string());
                return;
            }
            Err(find_error) => {
                item.fail(format!("failed to load event: {find_error}"));
                return;
            }
        };

        let part_number = item.release.part.as_deref().and_then(|name| {
            Part::from_name(name)
                .and_then(|part| part.number(infer_event_type(&event.title)))
                .map(|n| n as i32)
        });

        let request = ImportRequest {
            client_host: client.config().host.clone(),
            vendor_save_path: save_path,
            quality: item.release.quality.clone(),
            part_name: item.release.part.clone(),
            part_number,
        };

        match self.importer.import(&event, &request).await {
            Ok(outcome) => {
                if let Err(transition_error) = item.transition_to(QueueStatus::Imported) {
                    warn!(item = %item.release.title, %transition_error, "import finished but transition failed");
                    return;
                }
                info!(
                    event = %event.title,
                    destination = %outcome.destination.display(),
                    "download imported"
                );
            }
            Err(import_error) => {
                item.fail(format!("import failed: {import_error}"));
            }
        }
    }
}

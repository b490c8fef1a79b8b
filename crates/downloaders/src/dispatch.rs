//! Download dispatch
//!
//! Pushes a chosen release to the best download client for its protocol and
//! persists the durable queue item that the monitor loop will drive through
//! the state machine.

use crate::{AddDownloadErrorKind, DownloadClient};
use arenarr_core::domain::repositories::QueueRepository;
use arenarr_core::models::event::Event;
use arenarr_core::models::queue::{DownloadQueueItem, ReleaseSnapshot};
use arenarr_core::models::release::ReleaseSearchResult;
use arenarr_core::{ArenarrError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Dispatches grabs to download clients
pub struct DownloadDispatcher {
    clients: Vec<Arc<dyn DownloadClient>>,
    queue_repository: Arc<dyn QueueRepository>,
}

impl DownloadDispatcher {
    pub fn new(
        clients: Vec<Arc<dyn DownloadClient>>,
        queue_repository: Arc<dyn QueueRepository>,
    ) -> Self {
        Self {
            clients,
            queue_repository,
        }
    }

    /// The enabled client supporting the release's protocol with the best
    /// (lowest) priority value.
    fn pick_client(&self, release: &ReleaseSearchResult) -> Option<&Arc<dyn DownloadClient>> {
        self.clients
            .iter()
            .filter(|client| {
                let config = client.config();
                config.enabled && config.protocol() == release.protocol
            })
            .min_by_key(|client| client.config().priority)
    }

    /// Grab a release for an event: push it to a client, then persist the
    /// queue item. `retry_count` carries across re-grabs of the same event.
    pub async fn grab(
        &self,
        event: &Event,
        release: &ReleaseSearchResult,
        retry_count: u32,
    ) -> Result<DownloadQueueItem> {
        let client = self
            .pick_client(release)
            .ok_or_else(|| ArenarrError::DownloadClientError {
                client: "none".to_string(),
                error: format!(
                    "no enabled download client supports protocol {}",
                    release.protocol
                ),
            })?;
        let config = client.config();

        info!(
            event = %event.title,
            release = %release.title,
            client = %config.name,
            "dispatching grab"
        );

        let result = client
            .add_download(&release.download_url, &config.category, Some(&release.title))
            .await?;

        if !result.success {
            let kind = result.error.unwrap_or(AddDownloadErrorKind::Unknown);
            let message = result.message.unwrap_or_else(|| kind.to_string());
            warn!(event = %event.title, %kind, %message, "grab failed");
            return Err(ArenarrError::DownloadClientError {
                client: config.name.clone(),
                error: format!("{kind}: {message}"),
            });
        }

        let mut item =
            DownloadQueueItem::new(event.id, ReleaseSnapshot::from(release), config.id);
        item.download_id = result.download_id;
        item.retry_count = retry_count;
        self.queue_repository.add(&item).await?;

        Ok(item)
    }
}

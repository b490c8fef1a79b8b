//! Search orchestrator
//!
//! Fans one query out across every healthy indexer under a bounded
//! semaphore, aggregates and evaluates the results, and keeps a process-wide
//! `ActiveSearchStatus` cell current for the UI. One sick indexer never
//! fails the whole search: its error is recorded against its health record
//! and the fan-out carries on.

use crate::status::IndexerStatusTracker;
use crate::torznab::IndexerClient;
use arenarr_core::domain::repositories::DownloadClientRepository;
use arenarr_core::models::event::Event;
use arenarr_core::models::release::{ReleaseProtocol, ReleaseSearchResult};
use arenarr_core::{ArenarrError, Result};
use arenarr_decision::{evaluate_release, parse_title, sort_search_results, EvaluationContext};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Live progress of the current search, rendered by the UI.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSearchStatus {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub releases_found: usize,
    pub started_at: DateTime<Utc>,
    pub is_complete: bool,
    /// Indexers skipped this run, with the reason
    pub skipped: Vec<String>,
}

/// Process-wide singleton; a typed cell behind a mutex, not an ad-hoc global.
static ACTIVE_SEARCH: Lazy<Mutex<Option<ActiveSearchStatus>>> = Lazy::new(|| Mutex::new(None));

/// Snapshot of the currently-running search, if any.
pub fn current_search_status() -> Option<ActiveSearchStatus> {
    ACTIVE_SEARCH.lock().expect("search status lock").clone()
}

fn update_search_status(apply: impl FnOnce(&mut ActiveSearchStatus)) {
    let mut cell = ACTIVE_SEARCH.lock().expect("search status lock");
    if let Some(status) = cell.as_mut() {
        apply(status);
    }
}

fn publish_search_status(status: ActiveSearchStatus) {
    *ACTIVE_SEARCH.lock().expect("search status lock") = Some(status);
}

fn clear_search_status_after(linger: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(linger).await;
        let mut cell = ACTIVE_SEARCH.lock().expect("search status lock");
        if cell.as_ref().map(|s| s.is_complete).unwrap_or(false) {
            *cell = None;
        }
    });
}

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct SearchOrchestratorConfig {
    /// Bound on concurrent indexer queries per search
    pub max_concurrent: usize,
    /// How long a finished search status stays visible
    pub status_linger: Duration,
}

impl Default for SearchOrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            status_linger: Duration::from_secs(5),
        }
    }
}

/// Concurrent fan-out over indexer clients
pub struct SearchOrchestrator {
    clients: Vec<Arc<dyn IndexerClient>>,
    status_tracker: Arc<IndexerStatusTracker>,
    download_clients: Arc<dyn DownloadClientRepository>,
    config: SearchOrchestratorConfig,
}

impl SearchOrchestrator {
    pub fn new(
        clients: Vec<Arc<dyn IndexerClient>>,
        status_tracker: Arc<IndexerStatusTracker>,
        download_clients: Arc<dyn DownloadClientRepository>,
    ) -> Self {
        Self {
            clients,
            status_tracker,
            download_clients,
            config: SearchOrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchOrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Protocols backed by at least one enabled download client.
    async fn available_protocols(&self) -> Result<HashSet<ReleaseProtocol>> {
        Ok(self
            .download_clients
            .list_enabled()
            .await?
            .into_iter()
            .map(|client| client.protocol())
            .collect())
    }

    /// Select the clients eligible for this run, logging every skip.
    async fn eligible_clients(
        &self,
        rss: bool,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Arc<dyn IndexerClient>>, Vec<String>)> {
        let protocols = self.available_protocols().await?;
        let mut eligible = Vec::new();
        let mut skipped = Vec::new();

        for client in &self.clients {
            let indexer = client.indexer();
            if !indexer.enabled {
                continue;
            }
            if rss && !indexer.enable_rss {
                continue;
            }
            if !rss && !indexer.enable_automatic_search {
                continue;
            }
            if !protocols.contains(&indexer.protocol.release_protocol()) {
                info!(
                    indexer = %indexer.name,
                    protocol = %indexer.protocol,
                    "skipping indexer: no enabled download client supports its protocol"
                );
                skipped.push(format!("{}: no download client", indexer.name));
                continue;
            }
            let (available, reason) = self.status_tracker.is_available(indexer.id, now).await;
            if !available {
                let reason = reason.unwrap_or_else(|| "unavailable".to_string());
                debug!(indexer = %indexer.name, %reason, "skipping unhealthy indexer");
                skipped.push(format!("{}: {}", indexer.name, reason));
                continue;
            }
            eligible.push(Arc::clone(client));
        }
        Ok((eligible, skipped))
    }

    /// Fan a fetch out across eligible clients and aggregate the results.
    /// Indexer-level failures are swallowed here and recorded on the
    /// indexer's health record.
    async fn fan_out(
        &self,
        query: Option<String>,
        limit: u32,
        rss: bool,
    ) -> Result<Vec<ReleaseSearchResult>> {
        let now = Utc::now();
        let (eligible, skipped) = self.eligible_clients(rss, now).await?;

        publish_search_status(ActiveSearchStatus {
            total: eligible.len(),
            active: 0,
            completed: 0,
            releases_found: 0,
            started_at: now,
            is_complete: false,
            skipped,
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut join_set: JoinSet<(i32, String, Result<Vec<ReleaseSearchResult>>)> =
            JoinSet::new();

        for client in eligible {
            let semaphore = Arc::clone(&semaphore);
            let query = query.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                update_search_status(|status| status.active += 1);
                let indexer = client.indexer();
                let outcome = match &query {
                    Some(query) => client.search(query, limit).await,
                    None => client.fetch_rss(limit).await,
                };
                (indexer.id, indexer.name.clone(), outcome)
            });
        }

        let mut releases = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let (indexer_id, indexer_name, outcome) = match joined {
                Ok(result) => result,
                Err(join_error) => {
                    warn!(%join_error, "indexer task panicked");
                    continue;
                }
            };
            let now = Utc::now();
            let found = match outcome {
                Ok(batch) => {
                    self.status_tracker.record_success(indexer_id, now).await;
                    let count = batch.len();
                    releases.extend(batch);
                    count
                }
                Err(ArenarrError::RateLimited {
                    retry_after_secs, ..
                }) => {
                    warn!(indexer = %indexer_name, retry_after_secs, "indexer rate limited");
                    self.status_tracker
                        .record_rate_limit(indexer_id, retry_after_secs, now)
                        .await;
                    0
                }
                Err(error) => {
                    warn!(indexer = %indexer_name, %error, "indexer query failed");
                    self.status_tracker
                        .record_failure(indexer_id, error.to_string(), now)
                        .await;
                    0
                }
            };
            update_search_status(|status| {
                status.active = status.active.saturating_sub(1);
                status.completed += 1;
                status.releases_found += found;
            });
        }

        update_search_status(|status| status.is_complete = true);
        clear_search_status_after(self.config.status_linger);
        Ok(releases)
    }

    /// Active search: fan out, filter by per-indexer seeder minimums,
    /// evaluate against the event's policy and sort best-first. Rejected
    /// releases are returned too, annotated with their reasons.
    pub async fn search(
        &self,
        event: &Event,
        query: &str,
        ctx: &EvaluationContext<'_>,
        limit: u32,
    ) -> Result<Vec<ReleaseSearchResult>> {
        let mut releases = self.fan_out(Some(query.to_string()), limit, false).await?;
        self.filter_minimum_seeders(&mut releases);

        for release in releases.iter_mut() {
            let parsed = parse_title(&release.title);
            let evaluation = evaluate_release(release, &parsed, event, ctx);
            evaluation.annotate(release, &parsed);
        }

        sort_search_results(&mut releases);
        Ok(releases)
    }

    /// Passive discovery: no-query RSS fetch across all RSS-enabled
    /// indexers. Results are unevaluated; the RSS sync loop matches and
    /// evaluates them against monitored events.
    pub async fn fetch_all_rss(
        &self,
        per_indexer_limit: u32,
    ) -> Result<Vec<ReleaseSearchResult>> {
        let mut releases = self.fan_out(None, per_indexer_limit, true).await?;
        self.filter_minimum_seeders(&mut releases);
        Ok(releases)
    }

    fn filter_minimum_seeders(&self, releases: &mut Vec<ReleaseSearchResult>) {
        let minimums: std::collections::HashMap<i32, i32> = self
            .clients
            .iter()
            .map(|client| (client.indexer().id, client.indexer().minimum_seeders))
            .collect();
        releases.retain(|release| {
            if release.protocol != ReleaseProtocol::Torrent {
                return true;
            }
            let minimum = minimums.get(&release.indexer_id).copied().unwrap_or(0);
            release.seeders.unwrap_or(0) >= minimum
        });
    }
}

//! RSS sync loop
//!
//! The passive discovery cycle: fetch recent releases from every indexer,
//! fill the release cache, match candidates against monitored events, run
//! the grab checklist and dispatch downloads. Event-level problems are
//! logged and skipped; the loop itself never aborts.

use arenarr_core::domain::repositories::{
    BlocklistRepository, CustomFormatRepository, DelayProfileRepository, EventFileRepository,
    EventRepository, QualityProfileRepository, QueueRepository, ReleaseCacheRepository,
};
use arenarr_core::models::blocklist::BlocklistItem;
use arenarr_core::models::delay_profile::DelayProfile;
use arenarr_core::models::event::Event;
use arenarr_core::models::parsed::ParsedRelease;
use arenarr_core::models::quality::{QualityDefinition, QualityProfile};
use arenarr_core::models::queue::grab_retry_backoff;
use arenarr_core::models::release::{CachedRelease, ReleaseSearchResult};
use arenarr_core::Result;
use arenarr_decision::{
    content_tokens, evaluate_release, match_release, normalize_title, parse_title, search_terms,
    AliasTable, Evaluation, EvaluationContext, SearchNormalizer,
};
use arenarr_downloaders::DownloadDispatcher;
use arenarr_indexers::SearchOrchestrator;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Cool-down after a failed tick.
const ERROR_COOLDOWN: std::time::Duration = std::time::Duration::from_secs(5 * 60);

/// Repeated failures of one info hash before it is blocklisted.
const AUTO_BLOCKLIST_FAILURES: i64 = 3;

/// Where RSS releases come from; the orchestrator in production, a stub in
/// tests.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn fetch_all_rss(&self, per_indexer_limit: u32) -> Result<Vec<ReleaseSearchResult>>;
}

#[async_trait]
impl ReleaseSource for SearchOrchestrator {
    async fn fetch_all_rss(&self, per_indexer_limit: u32) -> Result<Vec<ReleaseSearchResult>> {
        SearchOrchestrator::fetch_all_rss(self, per_indexer_limit).await
    }
}

/// RSS sync loop configuration
#[derive(Debug, Clone)]
pub struct RssSyncConfig {
    pub interval: std::time::Duration,
    pub per_indexer_limit: u32,
    pub age_limit_days: i64,
    pub multi_part_enabled: bool,
    pub enabled: bool,
}

/// Outcome counters for one tick
#[derive(Debug, Clone, Default)]
pub struct RssTickSummary {
    pub fetched: usize,
    pub cached: usize,
    pub swept: u64,
    pub matched: usize,
    pub grabbed: usize,
}

enum GrabDecision {
    Grab { retry_count: u32 },
    Skip(String),
}

/// The RSS sync background job
pub struct RssSyncJob {
    config: RssSyncConfig,
    source: Arc<dyn ReleaseSource>,
    cache: Arc<dyn ReleaseCacheRepository>,
    events: Arc<dyn EventRepository>,
    event_files: Arc<dyn EventFileRepository>,
    queue: Arc<dyn QueueRepository>,
    profiles: Arc<dyn QualityProfileRepository>,
    formats: Arc<dyn CustomFormatRepository>,
    delay_profiles: Arc<dyn DelayProfileRepository>,
    blocklist: Arc<dyn BlocklistRepository>,
    dispatcher: Arc<DownloadDispatcher>,
    normalizer: AliasTable,
}

impl RssSyncJob {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RssSyncConfig,
        source: Arc<dyn ReleaseSource>,
        cache: Arc<dyn ReleaseCacheRepository>,
        events: Arc<dyn EventRepository>,
        event_files: Arc<dyn EventFileRepository>,
        queue: Arc<dyn QueueRepository>,
        profiles: Arc<dyn QualityProfileRepository>,
        formats: Arc<dyn CustomFormatRepository>,
        delay_profiles: Arc<dyn DelayProfileRepository>,
        blocklist: Arc<dyn BlocklistRepository>,
        dispatcher: Arc<DownloadDispatcher>,
    ) -> Self {
        Self {
            config,
            source,
            cache,
            events,
            event_files,
            queue,
            profiles,
            formats,
            delay_profiles,
            blocklist,
            dispatcher,
            normalizer: AliasTable::new(),
        }
    }

    /// Run the loop. Overrunning ticks are not stacked; a failed tick backs
    /// off for five minutes before the next attempt.
    pub async fn start(self: Arc<Self>) {
        if !self.config.enabled {
            info!("rss sync is disabled");
            return;
        }
        info!(interval = ?self.config.interval, "starting rss sync loop");

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match self.tick().await {
                Ok(summary) => {
                    info!(
                        fetched = summary.fetched,
                        cached = summary.cached,
                        matched = summary.matched,
                        grabbed = summary.grabbed,
                        "rss sync tick complete"
                    );
                }
                Err(tick_error) => {
                    error!(%tick_error, "rss sync tick failed");
                    tokio::time::sleep(ERROR_COOLDOWN).await;
                }
            }
        }
    }

    /// One full RSS cycle.
    pub async fn tick(&self) -> Result<RssTickSummary> {
        let now = Utc::now();
        let mut summary = RssTickSummary::default();

        // 1. Fetch and age-filter
        let mut releases = self
            .source
            .fetch_all_rss(self.config.per_indexer_limit)
            .await?;
        summary.fetched = releases.len();
        let age_cutoff = now - Duration::days(self.config.age_limit_days);
        releases.retain(|release| {
            release
                .publish_date
                .map(|published| published >= age_cutoff)
                .unwrap_or(true)
        });

        // 2. Parse and fill the cache
        let parsed_releases: Vec<(ReleaseSearchResult, ParsedRelease)> = releases
            .into_iter()
            .map(|release| {
                let parsed = parse_title(&release.title);
                (release, parsed)
            })
            .collect();

        let entries: Vec<CachedRelease> = parsed_releases
            .iter()
            .map(|(release, parsed)| {
                let normalized = self.normalizer.normalize(&normalize_title(&release.title));
                let terms = search_terms(
                    &normalized,
                    parsed.sport_prefix.as_deref(),
                    &self.normalizer,
                );
                CachedRelease::from_release(release, parsed, normalized, terms, true, now)
            })
            .collect();
        summary.cached = self.cache.upsert_batch(&entries).await?;
        summary.swept = self.cache.sweep_expired(now).await?;

        // 3. Load monitored events and policy
        let events = self.events.find_monitored().await?;
        if events.is_empty() {
            return Ok(summary);
        }
        let profiles: HashMap<i32, QualityProfile> = self
            .profiles
            .list()
            .await?
            .into_iter()
            .map(|profile| (profile.id, profile))
            .collect();
        let formats = self.formats.list().await?;
        let delay_profiles = self.delay_profiles.list().await?;

        // Cheap keyword pre-filter data, computed once per event
        let event_tokens: HashMap<Uuid, HashSet<String>> = events
            .iter()
            .map(|event| {
                (
                    event.id,
                    content_tokens(&self.normalizer.normalize(&normalize_title(&event.title))),
                )
            })
            .collect();

        let mut grabbed_events: HashSet<Uuid> = HashSet::new();
        for (release, parsed) in &parsed_releases {
            let release_tokens =
                content_tokens(&self.normalizer.normalize(&normalize_title(&release.title)));

            for event in &events {
                if grabbed_events.contains(&event.id) {
                    continue;
                }
                if !self.prefilter(event, parsed, &release_tokens, &event_tokens[&event.id]) {
                    continue;
                }

                let outcome = match_release(
                    event,
                    parsed,
                    &self.normalizer,
                    self.config.multi_part_enabled,
                );
                if !outcome.is_match {
                    continue;
                }
                summary.matched += 1;

                let profile = event
                    .quality_profile_id
                    .and_then(|id| profiles.get(&id))
                    .cloned()
                    .unwrap_or_else(QualityProfile::default_profile);
                let ctx = EvaluationContext {
                    multi_part_enabled: self.config.multi_part_enabled,
                    ..EvaluationContext::new(&profile, &formats)
                };
                let evaluation = evaluate_release(release, parsed, event, &ctx);
                if !evaluation.approved {
                    debug!(
                        release = %release.title,
                        event = %event.title,
                        rejections = ?evaluation.rejections,
                        "matched release rejected"
                    );
                    break;
                }

                let mut candidate = release.clone();
                evaluation.annotate(&mut candidate, parsed);

                match self
                    .should_grab(event, &candidate, &evaluation, &profile, &delay_profiles, now)
                    .await
                {
                    Ok(GrabDecision::Grab { retry_count }) => {
                        match self.dispatcher.grab(event, &candidate, retry_count).await {
                            Ok(_) => {
                                summary.grabbed += 1;
                                grabbed_events.insert(event.id);
                            }
                            Err(grab_error) => {
                                warn!(event = %event.title, %grab_error, "grab failed");
                            }
                        }
                    }
                    Ok(GrabDecision::Skip(reason)) => {
                        debug!(event = %event.title, release = %release.title, %reason, "grab skipped");
                    }
                    Err(check_error) => {
                        warn!(event = %event.title, %check_error, "grab checklist failed");
                    }
                }
                // First matching event claims the release
                break;
            }
        }

        Ok(summary)
    }

    /// Keyword presence pre-filter so the N x M scan stays cheap.
    fn prefilter(
        &self,
        event: &Event,
        parsed: &ParsedRelease,
        release_tokens: &HashSet<String>,
        event_tokens: &HashSet<String>,
    ) -> bool {
        if let (Some(release_prefix), Some(event_prefix)) =
            (parsed.sport_prefix.as_deref(), event.sport_prefix.as_deref())
        {
            if release_prefix.eq_ignore_ascii_case(event_prefix) {
                return true;
            }
        }
        !release_tokens.is_disjoint(event_tokens)
    }

    /// The grab checklist from the sync design: queue state, blocklist,
    /// retry backoff, upgrade policy and propagation delay.
    async fn should_grab(
        &self,
        event: &Event,
        release: &ReleaseSearchResult,
        evaluation: &Evaluation,
        profile: &QualityProfile,
        delay_profiles: &[DelayProfile],
        now: DateTime<Utc>,
    ) -> Result<GrabDecision> {
        // At most one active grab per event
        let existing = self.queue.find_by_event(event.id).await?;
        if existing.iter().any(|item| !item.status.is_terminal()) {
            return Ok(GrabDecision::Skip(
                "event already has an active download".to_string(),
            ));
        }

        let mut retry_count = 0;
        if let Some(hash) = release.torrent_info_hash.as_deref() {
            if self.blocklist.contains(event.id, hash).await? {
                return Ok(GrabDecision::Skip("release is blocklisted".to_string()));
            }

            let failures = self.queue.count_failures(event.id, hash).await?;
            if failures >= AUTO_BLOCKLIST_FAILURES {
                self.blocklist
                    .add(&BlocklistItem::new(
                        event.id,
                        hash.to_string(),
                        release.title.clone(),
                        format!("failed {failures} times"),
                    ))
                    .await?;
                return Ok(GrabDecision::Skip(
                    "release blocklisted after repeated failures".to_string(),
                ));
            }

            if let Some(failed) = self.queue.find_latest_failed(event.id, hash).await? {
                let backoff = grab_retry_backoff(failed.retry_count);
                if now - failed.last_update < backoff {
                    return Ok(GrabDecision::Skip(format!(
                        "inside retry backoff ({}m remaining)",
                        (backoff - (now - failed.last_update)).num_minutes()
                    )));
                }
                retry_count = failed.retry_count + 1;
            }
        }

        // Upgrade policy against existing files for the same part
        if event.has_file {
            if !profile.upgrade_allowed {
                return Ok(GrabDecision::Skip(
                    "profile does not allow upgrades".to_string(),
                ));
            }
            let files = self.event_files.find_by_event(event.id).await?;
            let relevant: Vec<_> = files
                .iter()
                .filter(|file| file.exists)
                .filter(|file| match release.part {
                    Some(part) => file.part_name.as_deref() == Some(part.name()),
                    None => true,
                })
                .collect();

            let mut best_existing_score = None;
            for file in &relevant {
                let Some(definition) = QualityDefinition::by_title(&file.quality) else {
                    continue;
                };
                if profile.meets_cutoff(definition) {
                    return Ok(GrabDecision::Skip(
                        "existing file already meets the profile cutoff".to_string(),
                    ));
                }
                if let Some(rank) = profile.rank(definition) {
                    let score = rank * arenarr_decision::engine::QUALITY_RANK_WEIGHT;
                    best_existing_score =
                        Some(best_existing_score.map_or(score, |best: i32| best.max(score)));
                }
            }

            if let Some(existing_score) = best_existing_score {
                if evaluation.quality_score <= existing_score {
                    return Ok(GrabDecision::Skip(format!(
                        "not an upgrade over existing quality (score {existing_score})"
                    )));
                }
            }
        }

        // Propagation delay
        if let Some(delay_profile) = DelayProfile::select(delay_profiles, &event.tags) {
            let is_highest_quality = QualityDefinition::by_title(
                evaluation.quality.as_str(),
            )
            .map(|definition| profile.meets_cutoff(definition))
            .unwrap_or(false);
            if delay_profile.is_delayed(
                release.publish_date,
                release.protocol,
                is_highest_quality,
                evaluation.custom_format_score,
                now,
            ) {
                return Ok(GrabDecision::Skip(
                    "release is inside its propagation delay window".to_string(),
                ));
            }
        }

        Ok(GrabDecision::Grab { retry_count })
    }
}

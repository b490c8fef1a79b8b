//! End-to-end pipeline scenarios over in-memory repositories
//!
//! Drives the RSS sync loop and download monitor the way the service does,
//! with a scripted indexer feed and download client.

mod common;

use arenarr::jobs::{
    DownloadMonitorConfig, DownloadMonitorJob, RssSyncConfig, RssSyncJob,
};
use arenarr_core::domain::repositories::*;
use arenarr_core::models::download_client::{DownloadClientConfig, DownloadClientKind};
use arenarr_core::models::event::{Event, EventFile, Sport};
use arenarr_core::models::quality::QualityProfile;
use arenarr_core::models::queue::QueueStatus;
use arenarr_core::models::release::{ReleaseProtocol, ReleaseSearchResult};
use arenarr_downloaders::{
    DownloadClient, DownloadClientStatus, DownloadDispatcher, DownloadStatusKind,
};
use arenarr_import::{DefaultNameBuilder, ImportConfig, ImportPipeline, SpaceProbe};
use chrono::{Duration, TimeZone, Utc};
use common::*;
use std::path::Path;
use std::sync::Arc;

struct Pipeline {
    job: RssSyncJob,
    events: Arc<InMemoryEvents>,
    event_files: Arc<InMemoryEventFiles>,
    cache: Arc<InMemoryReleaseCache>,
    queue: Arc<InMemoryQueue>,
    blocklist: Arc<InMemoryBlocklist>,
    client: Arc<ScriptedDownloadClient>,
    source: Arc<StubReleaseSource>,
}

fn pipeline(
    events: Vec<Event>,
    files: Vec<EventFile>,
    releases: Vec<ReleaseSearchResult>,
    multi_part: bool,
) -> Pipeline {
    let events_repo = Arc::new(InMemoryEvents::seed(events));
    let event_files = Arc::new(InMemoryEventFiles::default());
    for file in files {
        event_files.files.lock().unwrap().push(file);
    }
    let cache = Arc::new(InMemoryReleaseCache::default());
    let queue = Arc::new(InMemoryQueue::default());
    let blocklist = Arc::new(InMemoryBlocklist::default());
    let source = Arc::new(StubReleaseSource::new(releases));

    let mut client_config = DownloadClientConfig::new(
        "qbit".to_string(),
        DownloadClientKind::QBittorrent,
        "localhost".to_string(),
        8080,
    );
    client_config.id = 1;
    let client = Arc::new(ScriptedDownloadClient::new(client_config));

    let dispatcher = Arc::new(DownloadDispatcher::new(
        vec![Arc::clone(&client) as Arc<dyn DownloadClient>],
        Arc::clone(&queue) as Arc<dyn QueueRepository>,
    ));

    let job = RssSyncJob::new(
        RssSyncConfig {
            interval: std::time::Duration::from_secs(900),
            per_indexer_limit: 500,
            age_limit_days: 14,
            multi_part_enabled: multi_part,
            enabled: true,
        },
        Arc::clone(&source) as _,
        Arc::clone(&cache) as _,
        Arc::clone(&events_repo) as _,
        Arc::clone(&event_files) as _,
        Arc::clone(&queue) as _,
        Arc::new(StaticProfiles(vec![QualityProfile::default_profile()])) as _,
        Arc::new(StaticFormats(vec![])) as _,
        Arc::new(StaticDelayProfiles(vec![])) as _,
        Arc::clone(&blocklist) as _,
        dispatcher,
    );

    Pipeline {
        job,
        events: events_repo,
        event_files,
        cache,
        queue,
        blocklist,
        client,
        source,
    }
}

fn ufc_event(monitored_parts: Vec<&str>) -> Event {
    let mut event = Event::new("UFC 310: Pantoja vs Asakura".to_string(), Sport::Fighting);
    event.league_id = Some(1);
    event.sport_prefix = Some("UFC".to_string());
    event.event_date = Some(Utc.with_ymd_and_hms(2024, 12, 7, 0, 0, 0).unwrap());
    event.runtime_mins = Some(300);
    event.quality_profile_id = Some(1);
    event.monitored_parts = monitored_parts.into_iter().map(String::from).collect();
    event
}

fn release(title: &str, guid: &str) -> ReleaseSearchResult {
    let mut release = ReleaseSearchResult::new(
        1,
        "mock-indexer".to_string(),
        title.to_string(),
        guid.to_string(),
        format!("http://indexer.test/dl/{guid}"),
        ReleaseProtocol::Torrent,
    );
    release.size_bytes = Some(8 * 1024 * 1024 * 1024);
    release.seeders = Some(40);
    release.publish_date = Some(Utc::now() - Duration::hours(6));
    release.torrent_info_hash = Some(format!("hash-{guid}"));
    release
}

#[tokio::test]
async fn ufc_part_release_is_grabbed_when_part_is_monitored() {
    let p = pipeline(
        vec![ufc_event(vec!["Early Prelims"])],
        vec![],
        vec![release(
            "UFC.310.Early.Prelims.2024.1080p.WEB-DL-GROUP",
            "g1",
        )],
        true,
    );

    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.grabbed, 1);

    let queue = p.queue.items.lock().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].status, QueueStatus::Queued);
    assert_eq!(queue[0].release.part.as_deref(), Some("Early Prelims"));
    assert_eq!(queue[0].release.quality.as_deref(), Some("WEBDL-1080p"));
    assert_eq!(p.client.added.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn ufc_part_release_is_rejected_when_other_part_is_monitored() {
    let p = pipeline(
        vec![ufc_event(vec!["Main Card"])],
        vec![],
        vec![release(
            "UFC.310.Early.Prelims.2024.1080p.WEB-DL-GROUP",
            "g1",
        )],
        true,
    );

    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.grabbed, 0);
    assert!(p.queue.items.lock().unwrap().is_empty());
    assert!(p.client.added.lock().unwrap().is_empty());
}

#[tokio::test]
async fn f1_round_and_location_pick_the_right_release() {
    let mut event = Event::new("Abu Dhabi Grand Prix".to_string(), Sport::Motorsport);
    event.league_id = Some(2);
    event.sport_prefix = Some("Formula1".to_string());
    event.round = Some(24);
    event.location = Some("Abu Dhabi".to_string());
    event.event_date = Some(Utc.with_ymd_and_hms(2025, 12, 7, 0, 0, 0).unwrap());
    event.quality_profile_id = Some(1);

    let p = pipeline(
        vec![event],
        vec![],
        vec![
            release("Formula1.2025.Round23.Qatar.GP.Race.1080p.WEB-DL-X", "x"),
            release("Formula1.2025.Round24.AbuDhabi.Race.1080p.WEB-DL-Y", "y"),
        ],
        false,
    );

    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.grabbed, 1);

    let queue = p.queue.items.lock().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].release.guid, "y");
}

#[tokio::test]
async fn quality_upgrade_is_grabbed_until_cutoff_is_met() {
    // Existing 720p HDTV file: a 1080p WEB-DL release is an upgrade
    let mut event = ufc_event(vec![]);
    event.has_file = true;
    let mut file = EventFile::new(
        event.id,
        "/media/ufc.310.720p.mkv".to_string(),
        4_000_000_000,
        "HDTV-720p".to_string(),
    );
    file.exists = true;

    let p = pipeline(
        vec![event.clone()],
        vec![file],
        vec![release("UFC.310.2024.1080p.WEB-DL-GROUP", "up1")],
        false,
    );
    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.grabbed, 1);

    // Existing file at the cutoff: nothing to upgrade to
    let mut cutoff_event = ufc_event(vec![]);
    cutoff_event.has_file = true;
    let mut cutoff_file = EventFile::new(
        cutoff_event.id,
        "/media/ufc.310.1080p.mkv".to_string(),
        8_000_000_000,
        "WEBDL-1080p".to_string(),
    );
    cutoff_file.exists = true;

    let p = pipeline(
        vec![cutoff_event],
        vec![cutoff_file],
        vec![release("UFC.310.2024.1080p.WEB-DL-OTHER", "up2")],
        false,
    );
    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.grabbed, 0);
}

#[tokio::test]
async fn one_active_grab_per_event() {
    let p = pipeline(
        vec![ufc_event(vec![])],
        vec![],
        vec![
            release("UFC.310.2024.1080p.WEB-DL-A", "a"),
            release("UFC.310.2024.1080p.WEB-DL-B", "b"),
        ],
        false,
    );

    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.grabbed, 1);
    assert_eq!(p.queue.items.lock().unwrap().len(), 1);

    // A second tick sees the active download and grabs nothing new
    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.grabbed, 0);
    assert_eq!(p.queue.items.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn repeated_failures_blocklist_the_release() {
    let event = ufc_event(vec![]);
    let p = pipeline(
        vec![event.clone()],
        vec![],
        vec![release("UFC.310.2024.1080p.WEB-DL-A", "a")],
        false,
    );

    // Three failed grabs of the same info hash already on record
    {
        let mut items = p.queue.items.lock().unwrap();
        for _ in 0..3 {
            let mut item = arenarr_core::models::queue::DownloadQueueItem::new(
                event.id,
                arenarr_core::models::queue::ReleaseSnapshot::from(&release(
                    "UFC.310.2024.1080p.WEB-DL-A",
                    "a",
                )),
                1,
            );
            item.fail("simulated".to_string());
            item.last_update = Utc::now() - Duration::days(2);
            items.push(item);
        }
    }

    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.grabbed, 0);
    assert!(p
        .blocklist
        .contains(event.id, "hash-a")
        .await
        .unwrap());
}

#[tokio::test]
async fn failed_grab_respects_retry_backoff() {
    let event = ufc_event(vec![]);
    let p = pipeline(
        vec![event.clone()],
        vec![],
        vec![release("UFC.310.2024.1080p.WEB-DL-A", "a")],
        false,
    );

    // One fresh failure: the 30 minute backoff still applies
    {
        let mut item = arenarr_core::models::queue::DownloadQueueItem::new(
            event.id,
            arenarr_core::models::queue::ReleaseSnapshot::from(&release(
                "UFC.310.2024.1080p.WEB-DL-A",
                "a",
            )),
            1,
        );
        item.fail("simulated".to_string());
        p.queue.items.lock().unwrap().push(item);
    }

    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.grabbed, 0);

    // Age the failure past the backoff window: retried with count + 1
    {
        let mut items = p.queue.items.lock().unwrap();
        items[0].last_update = Utc::now() - Duration::hours(2);
    }
    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.grabbed, 1);
    let queue = p.queue.items.lock().unwrap();
    let new_item = queue.iter().find(|i| i.status == QueueStatus::Queued).unwrap();
    assert_eq!(new_item.retry_count, 1);
}

#[tokio::test]
async fn rss_cache_grows_once_and_refreshes_ttl() {
    let releases: Vec<ReleaseSearchResult> = (0..100)
        .map(|n| {
            release(
                &format!("UFC.{}.Prelims.2024.1080p.WEB-DL-GRP", 200 + n),
                &format!("guid-{n}"),
            )
        })
        .collect();

    // No monitored events; this exercises only the cache path
    let p = pipeline(vec![], vec![], releases, true);

    p.job.tick().await.unwrap();
    let first_pass: Vec<_> = {
        let rows = p.cache.rows.lock().unwrap();
        assert_eq!(rows.len(), 100);
        rows.values()
            .map(|r| (r.guid.clone(), r.cached_at, r.expires_at))
            .collect()
    };

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    p.job.tick().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    p.job.tick().await.unwrap();

    {
        let rows = p.cache.rows.lock().unwrap();
        assert_eq!(rows.len(), 100, "overlapping ingests must not duplicate");
        for (guid, cached_at, first_expiry) in first_pass {
            let row = &rows[&guid];
            assert_eq!(row.cached_at, cached_at, "cached_at is set by first sight");
            assert!(row.expires_at > first_expiry, "ttl refreshed by later ticks");
        }
    }

    // Sweeping is idempotent within a tick: nothing is live-expired here
    let swept = p.cache.sweep_expired(Utc::now()).await.unwrap();
    let swept_again = p.cache.sweep_expired(Utc::now()).await.unwrap();
    assert_eq!(swept, 0);
    assert_eq!(swept_again, 0);
}

#[tokio::test]
async fn broad_cache_queries_require_every_term() {
    let p = pipeline(
        vec![],
        vec![],
        vec![
            release("UFC.310.Prelims.2024.1080p.WEB-DL-A", "q1"),
            release("UFC.309.Main.Card.2024.1080p.WEB-DL-B", "q2"),
        ],
        true,
    );
    p.job.tick().await.unwrap();

    let hits = p
        .cache
        .find_by_query(&["ufc".to_string(), "310".to_string()], 50)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].guid, "q1");

    let misses = p
        .cache
        .find_by_query(&["ufc".to_string(), "311".to_string()], 50)
        .await
        .unwrap();
    assert!(misses.is_empty());
}

#[tokio::test]
async fn cached_releases_can_be_matched_per_event() {
    let event = ufc_event(vec![]);
    let p = pipeline(
        vec![event.clone()],
        vec![],
        vec![
            release("UFC.310.Prelims.2024.1080p.WEB-DL-A", "m1"),
            release("UFC.309.Main.Card.2024.1080p.WEB-DL-B", "m2"),
        ],
        true,
    );
    p.job.tick().await.unwrap();

    let cache = Arc::clone(&p.cache) as Arc<dyn ReleaseCacheRepository>;
    let matches = arenarr::jobs::find_matching_cached(
        &cache,
        &event,
        &arenarr_decision::AliasTable::new(),
        true,
    )
    .await
    .unwrap();

    // Only the UFC 310 release survives the match engine
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].0.guid, "m1");
    assert!(matches[0].1.confidence >= arenarr_decision::MATCH_ACCEPT_THRESHOLD);
}

struct RoomyProbe;

impl SpaceProbe for RoomyProbe {
    fn free_space_bytes(&self, _path: &Path) -> Option<u64> {
        Some(u64::MAX)
    }

    fn is_accessible(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[tokio::test]
async fn completed_download_is_imported_by_the_monitor() {
    let downloads = tempfile::tempdir().unwrap();
    let library = tempfile::tempdir().unwrap();

    let p = pipeline(
        vec![ufc_event(vec![])],
        vec![],
        vec![release("UFC.310.2024.1080p.WEB-DL-GROUP", "g1")],
        false,
    );
    p.job.tick().await.unwrap();
    assert_eq!(p.queue.items.lock().unwrap().len(), 1);

    // Stage the completed payload where the client says it is
    let save_dir = downloads.path().join("UFC.310.2024.1080p.WEB-DL-GROUP");
    std::fs::create_dir_all(&save_dir).unwrap();
    std::fs::write(save_dir.join("ufc.310.mkv"), vec![0u8; 2048]).unwrap();

    let importer = Arc::new(ImportPipeline::new(
        ImportConfig {
            use_hardlinks: true,
            minimum_free_space_mb: 0,
            skip_free_space_check: false,
            delete_source_after_import: false,
        },
        Arc::new(DefaultNameBuilder),
        Arc::new(RoomyProbe),
        Arc::new(StaticMedia {
            roots: vec![arenarr_core::models::library::RootFolder {
                id: 1,
                path: library.path().display().to_string(),
            }],
            mappings: vec![],
        }),
        Arc::clone(&p.events) as Arc<dyn EventRepository>,
        Arc::clone(&p.event_files) as Arc<dyn EventFileRepository>,
        Arc::new(InMemoryHistory::default()) as Arc<dyn HistoryRepository>,
    ));

    let monitor = Arc::new(DownloadMonitorJob::new(
        DownloadMonitorConfig {
            interval: std::time::Duration::from_secs(30),
            terminal_grace_hours: 72,
            enabled: true,
        },
        vec![Arc::clone(&p.client) as Arc<dyn DownloadClient>],
        Arc::clone(&p.queue) as Arc<dyn QueueRepository>,
        Arc::clone(&p.events) as Arc<dyn EventRepository>,
        importer,
    ));

    let download_id = p.queue.items.lock().unwrap()[0]
        .download_id
        .clone()
        .unwrap();

    // First poll: still downloading
    p.client.set_status(
        &download_id,
        DownloadClientStatus {
            kind: DownloadStatusKind::Downloading,
            progress: 42.0,
            downloaded_bytes: Some(1024),
            size_bytes: Some(2048),
            time_remaining_secs: Some(120),
            save_path: Some(save_dir.display().to_string()),
            error: None,
        },
    );
    monitor.tick().await.unwrap();
    {
        let items = p.queue.items.lock().unwrap();
        assert_eq!(items[0].status, QueueStatus::Downloading);
        assert_eq!(items[0].progress, 42.0);
    }

    // Second poll: completed, which triggers the import
    p.client.set_status(
        &download_id,
        DownloadClientStatus {
            kind: DownloadStatusKind::Completed,
            progress: 100.0,
            downloaded_bytes: Some(2048),
            size_bytes: Some(2048),
            time_remaining_secs: None,
            save_path: Some(save_dir.display().to_string()),
            error: None,
        },
    );
    monitor.tick().await.unwrap();

    {
        let items = p.queue.items.lock().unwrap();
        assert_eq!(items[0].status, QueueStatus::Imported);
    }
    let files = p.event_files.files.lock().unwrap();
    assert_eq!(files.len(), 1);
    assert!(std::path::Path::new(&files[0].file_path).exists());
    // Seeding source stays in place
    assert!(save_dir.join("ufc.310.mkv").exists());

    let events = p.events.events.lock().unwrap();
    assert!(events.values().next().unwrap().has_file);
}

#[tokio::test]
async fn old_releases_are_age_filtered() {
    let mut stale = release("UFC.310.2024.1080p.WEB-DL-OLD", "old");
    stale.publish_date = Some(Utc::now() - Duration::days(30));

    let p = pipeline(vec![ufc_event(vec![])], vec![], vec![stale], false);
    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.grabbed, 0);
    assert_eq!(p.cache.rows.lock().unwrap().len(), 0);
}

#[tokio::test]
async fn source_errors_do_not_poison_later_ticks() {
    let p = pipeline(
        vec![ufc_event(vec![])],
        vec![],
        vec![release("UFC.310.2024.1080p.WEB-DL-GROUP", "g1")],
        false,
    );

    // Drain the feed: an empty tick is healthy, not an error
    p.source.releases.lock().unwrap().clear();
    let summary = p.job.tick().await.unwrap();
    assert_eq!(summary.fetched, 0);
}

//! Arenarr service entry point
//!
//! Wires configuration, the database, indexer and download-client adapters,
//! and the background loops (RSS sync, download monitor) together, then
//! runs until interrupted.

use arenarr_core::config::AppConfig;
use arenarr_core::{
    retry_with_backoff, ArenarrError, DownloadClientRepository, IndexerRepository, Result,
    RetryConfig, RetryPolicy,
};
use arenarr_downloaders::{
    DownloadClient, DownloadDispatcher, QBittorrentClient, SabnzbdClient, TransmissionClient,
};
use arenarr_import::{DefaultNameBuilder, ImportConfig, ImportPipeline, SystemSpaceProbe};
use arenarr_indexers::{IndexerClient, IndexerStatusTracker, SearchOrchestrator, TorznabClient};
use arenarr_infrastructure::{
    create_pool, run_migrations, DatabaseConfig, DatabasePool, PostgresBlocklistRepository,
    PostgresCustomFormatRepository, PostgresDelayProfileRepository,
    PostgresDownloadClientRepository, PostgresEventFileRepository, PostgresEventRepository,
    PostgresHistoryRepository, PostgresIndexerRepository, PostgresMediaManagementRepository,
    PostgresQualityProfileRepository, PostgresQueueRepository, PostgresReleaseCacheRepository,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arenarr::jobs::{DownloadMonitorConfig, DownloadMonitorJob, RssSyncConfig, RssSyncJob};
use arenarr_core::models::download_client::DownloadClientKind;

#[derive(Debug, Parser)]
#[command(name = "arenarr", about = "Sports event acquisition orchestrator")]
struct Args {
    /// Path to the configuration document
    #[arg(long, env = "ARENARR_CONFIG", default_value = "/var/lib/arenarr/config.json")]
    config: PathBuf,

    /// Log filter, e.g. `info` or `arenarr=debug`
    #[arg(long, env = "ARENARR_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| {
            EnvFilter::new("info")
        }))
        .init();

    info!("starting arenarr");

    let config = AppConfig::load(&args.config)?;
    if !args.config.exists() {
        config.save(&args.config)?;
        info!(path = %args.config.display(), "wrote default configuration");
    }

    let db_config = DatabaseConfig::new(&config.database_url);
    let pool = retry_with_backoff(
        RetryConfig::slow(),
        RetryPolicy::All,
        "database_connect",
        || create_pool(&db_config),
    )
    .await?;
    run_migrations(&pool).await?;

    let services = build_services(&config, pool).await?;

    let rss_job = Arc::clone(&services.rss_job);
    tokio::spawn(async move { rss_job.start().await });
    let monitor_job = Arc::clone(&services.monitor_job);
    tokio::spawn(async move { monitor_job.start().await });

    info!("arenarr is running; press ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| ArenarrError::ExternalServiceError {
            service: "signal".to_string(),
            error: e.to_string(),
        })?;
    info!("shutting down");
    Ok(())
}

struct Services {
    rss_job: Arc<RssSyncJob>,
    monitor_job: Arc<DownloadMonitorJob>,
}

async fn build_services(config: &AppConfig, pool: DatabasePool) -> Result<Services> {
    // Repositories
    let events = Arc::new(PostgresEventRepository::new(pool.clone()));
    let event_files = Arc::new(PostgresEventFileRepository::new(pool.clone()));
    let cache = Arc::new(PostgresReleaseCacheRepository::new(pool.clone()));
    let queue = Arc::new(PostgresQueueRepository::new(pool.clone()));
    let indexers = Arc::new(PostgresIndexerRepository::new(pool.clone()));
    let profiles = Arc::new(PostgresQualityProfileRepository::new(pool.clone()));
    let formats = Arc::new(PostgresCustomFormatRepository::new(pool.clone()));
    let delay_profiles = Arc::new(PostgresDelayProfileRepository::new(pool.clone()));
    let blocklist = Arc::new(PostgresBlocklistRepository::new(pool.clone()));
    let history = Arc::new(PostgresHistoryRepository::new(pool.clone()));
    let download_clients_repo = Arc::new(PostgresDownloadClientRepository::new(pool.clone()));
    let media = Arc::new(PostgresMediaManagementRepository::new(pool.clone()));

    // Indexer clients; configuration changes require a restart
    let mut indexer_clients: Vec<Arc<dyn IndexerClient>> = Vec::new();
    for indexer in indexers.list_enabled().await? {
        let name = indexer.name.clone();
        match TorznabClient::new(indexer) {
            Ok(client) => indexer_clients.push(Arc::new(client)),
            Err(client_error) => {
                warn!(indexer = %name, %client_error, "skipping misconfigured indexer");
            }
        }
    }
    info!(count = indexer_clients.len(), "indexer clients ready");

    let status_tracker = Arc::new(IndexerStatusTracker::with_repository(
        Arc::clone(&indexers) as _,
    ));
    status_tracker.load().await?;

    let orchestrator = Arc::new(SearchOrchestrator::new(
        indexer_clients,
        Arc::clone(&status_tracker),
        Arc::clone(&download_clients_repo) as _,
    ));

    // Download client adapters
    let mut client_adapters: Vec<Arc<dyn DownloadClient>> = Vec::new();
    for client_config in download_clients_repo.list_enabled().await? {
        let name = client_config.name.clone();
        let adapter: Result<Arc<dyn DownloadClient>> = match client_config.kind {
            DownloadClientKind::QBittorrent => {
                QBittorrentClient::new(client_config).map(|c| Arc::new(c) as _)
            }
            DownloadClientKind::Transmission => {
                TransmissionClient::new(client_config).map(|c| Arc::new(c) as _)
            }
            DownloadClientKind::Sabnzbd => {
                SabnzbdClient::new(client_config).map(|c| Arc::new(c) as _)
            }
            DownloadClientKind::Deluge | DownloadClientKind::Nzbget => {
                warn!(client = %name, kind = %client_config.kind, "unsupported download client kind");
                continue;
            }
        };
        match adapter {
            Ok(adapter) => client_adapters.push(adapter),
            Err(adapter_error) => {
                warn!(client = %name, %adapter_error, "skipping misconfigured download client");
            }
        }
    }
    info!(count = client_adapters.len(), "download clients ready");

    let dispatcher = Arc::new(DownloadDispatcher::new(
        client_adapters.clone(),
        Arc::clone(&queue) as _,
    ));

    let importer = Arc::new(ImportPipeline::new(
        ImportConfig {
            use_hardlinks: config.use_hardlinks,
            minimum_free_space_mb: config.minimum_free_space_mb,
            skip_free_space_check: config.skip_free_space_check,
            delete_source_after_import: config.recycle_after_import,
        },
        Arc::new(DefaultNameBuilder),
        Arc::new(SystemSpaceProbe),
        Arc::clone(&media) as _,
        Arc::clone(&events) as _,
        Arc::clone(&event_files) as _,
        Arc::clone(&history) as _,
    ));

    let rss_job = Arc::new(RssSyncJob::new(
        RssSyncConfig {
            interval: Duration::from_secs(config.effective_rss_interval_mins() as u64 * 60),
            per_indexer_limit: config.max_rss_releases_per_indexer,
            age_limit_days: config.rss_release_age_limit_days as i64,
            multi_part_enabled: config.enable_multi_part_episodes,
            enabled: true,
        },
        Arc::clone(&orchestrator) as _,
        Arc::clone(&cache) as _,
        Arc::clone(&events) as _,
        Arc::clone(&event_files) as _,
        Arc::clone(&queue) as _,
        Arc::clone(&profiles) as _,
        Arc::clone(&formats) as _,
        Arc::clone(&delay_profiles) as _,
        Arc::clone(&blocklist) as _,
        Arc::clone(&dispatcher),
    ));

    let monitor_job = Arc::new(DownloadMonitorJob::new(
        DownloadMonitorConfig::default(),
        client_adapters,
        Arc::clone(&queue) as _,
        Arc::clone(&events) as _,
        importer,
    ));

    Ok(Services {
        rss_job,
        monitor_job,
    })
}

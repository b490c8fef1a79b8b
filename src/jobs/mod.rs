//! Background service loops and pipeline queries

pub mod cache_query;
pub mod download_monitor;
pub mod rss_sync;

pub use cache_query::find_matching_cached;
pub use download_monitor::{DownloadMonitorConfig, DownloadMonitorJob};
pub use rss_sync::{ReleaseSource, RssSyncConfig, RssSyncJob, RssTickSummary};

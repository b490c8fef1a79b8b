//! Indexer configuration and health tracking

use super::release::ReleaseProtocol;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Wire protocol an indexer speaks. Torznab implies torrent releases,
/// Newznab implies usenet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexerProtocol {
    Torznab,
    Newznab,
}

impl IndexerProtocol {
    pub fn release_protocol(&self) -> ReleaseProtocol {
        match self {
            IndexerProtocol::Torznab => ReleaseProtocol::Torrent,
            IndexerProtocol::Newznab => ReleaseProtocol::Usenet,
        }
    }
}

impl std::fmt::Display for IndexerProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexerProtocol::Torznab => write!(f, "torznab"),
            IndexerProtocol::Newznab => write!(f, "newznab"),
        }
    }
}

impl std::str::FromStr for IndexerProtocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "torznab" => Ok(IndexerProtocol::Torznab),
            "newznab" => Ok(IndexerProtocol::Newznab),
            other => Err(format!("unknown indexer protocol: '{other}'")),
        }
    }
}

/// Indexer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indexer {
    pub id: i32,
    pub name: String,
    pub protocol: IndexerProtocol,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Torznab/Newznab category ids sent with every query
    pub categories: Vec<i32>,
    pub enabled: bool,
    pub enable_rss: bool,
    pub enable_automatic_search: bool,
    /// Lower value = tried earlier when ranking equal results
    pub priority: i32,
    /// Torrent results under this seeder count are dropped
    pub minimum_seeders: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Indexer {
    pub fn new(name: String, protocol: IndexerProtocol, base_url: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // assigned by the database
            name,
            protocol,
            base_url,
            api_key: None,
            categories: Vec::new(),
            enabled: true,
            enable_rss: true,
            enable_automatic_search: true,
            priority: 25,
            minimum_seeders: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Saturating backoff applied after consecutive transient failures.
const FAILURE_BACKOFF_SECS: [i64; 7] = [0, 60, 300, 900, 1800, 3600, 86_400];

/// Backoff for a given failure streak, saturating at the table's last entry.
pub fn failure_backoff(consecutive_failures: u32) -> Duration {
    let idx = (consecutive_failures as usize).min(FAILURE_BACKOFF_SECS.len() - 1);
    Duration::seconds(FAILURE_BACKOFF_SECS[idx])
}

/// Mutable per-indexer health record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerStatusRecord {
    pub indexer_id: i32,
    pub consecutive_failures: u32,
    pub disabled_until: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl IndexerStatusRecord {
    pub fn new(indexer_id: i32) -> Self {
        Self {
            indexer_id,
            consecutive_failures: 0,
            disabled_until: None,
            last_success: None,
            last_error: None,
        }
    }

    /// A successful query clears the failure streak and any cooldown.
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.consecutive_failures = 0;
        self.disabled_until = None;
        self.last_success = Some(now);
        self.last_error = None;
    }

    /// A transient failure extends the streak and disables the indexer for
    /// the tabled backoff.
    pub fn record_failure(&mut self, error: String, now: DateTime<Utc>) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let backoff = failure_backoff(self.consecutive_failures);
        self.disabled_until = if backoff > Duration::zero() {
            Some(now + backoff)
        } else {
            None
        };
        self.last_error = Some(error);
    }

    /// An HTTP 429 sets a cooldown from Retry-After without touching the
    /// failure streak.
    pub fn record_rate_limit(&mut self, retry_after_secs: u64, now: DateTime<Utc>) {
        let until = now + Duration::seconds(retry_after_secs as i64);
        // Never shorten an existing cooldown
        if self.disabled_until.map(|d| d < until).unwrap_or(true) {
            self.disabled_until = Some(until);
        }
        self.last_error = Some(format!("rate limited for {retry_after_secs}s"));
    }

    /// Whether the indexer may be queried now; the reason is returned for
    /// skip logging when it may not.
    pub fn is_available(&self, now: DateTime<Utc>) -> (bool, Option<String>) {
        match self.disabled_until {
            Some(until) if until > now => {
                let reason = match &self.last_error {
                    Some(error) => format!("disabled until {until}: {error}"),
                    None => format!("disabled until {until}"),
                };
                (false, Some(reason))
            }
            _ => (true, None),
        }
    }
}

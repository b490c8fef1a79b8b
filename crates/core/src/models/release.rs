//! Release domain models
//!
//! `ReleaseSearchResult` is the normalised release produced by indexer
//! clients and annotated by the evaluator. `CachedRelease` is the persisted,
//! de-duplicated form kept by the release cache.

use super::parsed::{ParsedRelease, Part};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Wire protocol a release is fetched over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseProtocol {
    Torrent,
    Usenet,
}

impl std::fmt::Display for ReleaseProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseProtocol::Torrent => write!(f, "torrent"),
            ReleaseProtocol::Usenet => write!(f, "usenet"),
        }
    }
}

impl std::str::FromStr for ReleaseProtocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "torrent" => Ok(ReleaseProtocol::Torrent),
            "usenet" => Ok(ReleaseProtocol::Usenet),
            other => Err(format!("unknown protocol: '{other}'")),
        }
    }
}

/// A normalised release candidate from an indexer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSearchResult {
    // Identification
    pub title: String,
    /// Indexer-supplied unique id; primary key of the release cache
    pub guid: String,
    pub download_url: String,
    pub info_url: Option<String>,
    pub indexer_id: i32,
    pub indexer: String,
    pub protocol: ReleaseProtocol,
    pub torrent_info_hash: Option<String>,

    // Wire attributes
    pub size_bytes: Option<i64>,
    pub seeders: Option<i32>,
    pub leechers: Option<i32>,
    pub publish_date: Option<DateTime<Utc>>,
    pub indexer_flags: Vec<String>,
    pub language: Option<String>,

    // Evaluation annotations, filled by the decision engine
    pub quality: Option<String>,
    pub score: i32,
    pub quality_score: i32,
    pub custom_format_score: i32,
    pub size_score: i32,
    pub approved: bool,
    pub rejections: Vec<String>,
    pub matched_formats: Vec<String>,
    pub part: Option<Part>,
    pub match_score: Option<f32>,
    pub is_pack: bool,
}

impl ReleaseSearchResult {
    pub fn new(
        indexer_id: i32,
        indexer: String,
        title: String,
        guid: String,
        download_url: String,
        protocol: ReleaseProtocol,
    ) -> Self {
        Self {
            title,
            guid,
            download_url,
            info_url: None,
            indexer_id,
            indexer,
            protocol,
            torrent_info_hash: None,
            size_bytes: None,
            seeders: None,
            leechers: None,
            publish_date: None,
            indexer_flags: Vec::new(),
            language: None,
            quality: None,
            score: 0,
            quality_score: 0,
            custom_format_score: 0,
            size_score: 0,
            approved: false,
            rejections: Vec::new(),
            matched_formats: Vec::new(),
            part: None,
            match_score: None,
            is_pack: false,
        }
    }

    /// Age of the release relative to `now`, when a publish date is known.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.publish_date.map(|published| now - published)
    }

    /// Sort key for the final search ordering: approved first, then quality,
    /// custom-format score, seeders, size score.
    pub fn ranking_key(&self) -> (bool, i32, i32, i32, i32) {
        (
            self.approved,
            self.quality_score,
            self.custom_format_score,
            self.seeders.unwrap_or(0),
            self.size_score,
        )
    }
}

/// A persisted release-cache entry, de-duplicated by guid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRelease {
    pub guid: String,
    pub title: String,
    pub normalized_title: String,
    /// Alias-expanded token set used for broad-query lookups
    pub search_terms: Vec<String>,
    pub download_url: String,
    pub info_url: Option<String>,
    pub indexer_id: i32,
    pub indexer: String,
    pub protocol: ReleaseProtocol,
    pub torrent_info_hash: Option<String>,
    pub size_bytes: Option<i64>,
    pub seeders: Option<i32>,
    pub leechers: Option<i32>,
    pub publish_date: Option<DateTime<Utc>>,
    pub indexer_flags: Vec<String>,

    // Parsed fields denormalised for candidate pre-filtering
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub round_number: Option<u32>,
    pub sport_prefix: Option<String>,

    pub from_rss: bool,
    pub cached_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedRelease {
    /// Default retention of a cache entry.
    pub const TTL_DAYS: i64 = 7;

    /// Build a cache entry from a fresh search result and its parse.
    ///
    /// `normalized_title` and `search_terms` are supplied by the caller so
    /// the cache model stays free of parsing concerns.
    pub fn from_release(
        release: &ReleaseSearchResult,
        parsed: &ParsedRelease,
        normalized_title: String,
        search_terms: Vec<String>,
        from_rss: bool,
        now: DateTime<Utc>,
    ) -> Self {
        use chrono::Datelike;
        Self {
            guid: release.guid.clone(),
            title: release.title.clone(),
            normalized_title,
            search_terms,
            download_url: release.download_url.clone(),
            info_url: release.info_url.clone(),
            indexer_id: release.indexer_id,
            indexer: release.indexer.clone(),
            protocol: release.protocol,
            torrent_info_hash: release.torrent_info_hash.clone(),
            size_bytes: release.size_bytes,
            seeders: release.seeders,
            leechers: release.leechers,
            publish_date: release.publish_date,
            indexer_flags: release.indexer_flags.clone(),
            year: parsed.year,
            month: parsed.date.map(|d| d.month()),
            day: parsed.date.map(|d| d.day()),
            round_number: parsed.round,
            sport_prefix: parsed.sport_prefix.clone(),
            from_rss,
            cached_at: now,
            last_seen: now,
            expires_at: now + Duration::days(Self::TTL_DAYS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Refresh the volatile fields from a re-seen copy of the same release.
    /// Identity fields never change.
    pub fn refresh_from(&mut self, release: &ReleaseSearchResult, now: DateTime<Utc>) {
        self.seeders = release.seeders;
        self.leechers = release.leechers;
        self.last_seen = now;
        self.expires_at = now + Duration::days(Self::TTL_DAYS);
    }

    /// Reconstitute a search result for matching and evaluation.
    pub fn to_search_result(&self) -> ReleaseSearchResult {
        let mut release = ReleaseSearchResult::new(
            self.indexer_id,
            self.indexer.clone(),
            self.title.clone(),
            self.guid.clone(),
            self.download_url.clone(),
            self.protocol,
        );
        release.info_url = self.info_url.clone();
        release.torrent_info_hash = self.torrent_info_hash.clone();
        release.size_bytes = self.size_bytes;
        release.seeders = self.seeders;
        release.leechers = self.leechers;
        release.publish_date = self.publish_date;
        release.indexer_flags = self.indexer_flags.clone();
        release
    }
}

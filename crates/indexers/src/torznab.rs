//! Torznab/Newznab wire client
//!
//! One client speaks both dialects: the query surface is identical and the
//! protocol tag on the indexer decides whether results are torrents or NZBs.
//! Responses are RSS 2.0 envelopes with `torznab:attr`/`newznab:attr`
//! extensions, deserialised with quick-xml.

use crate::rate_limit::RequestPacer;
use arenarr_core::models::indexer::Indexer;
use arenarr_core::models::release::ReleaseSearchResult;
use arenarr_core::{ArenarrError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default timeout for indexer requests.
pub const INDEXER_TIMEOUT_SECS: u64 = 30;

/// Capability set every indexer adapter provides.
#[async_trait]
pub trait IndexerClient: Send + Sync {
    fn indexer(&self) -> &Indexer;

    /// Active query. An empty query is an RSS-style recent-releases fetch.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<ReleaseSearchResult>>;

    /// No-query fetch of the most recent releases.
    async fn fetch_rss(&self, limit: u32) -> Result<Vec<ReleaseSearchResult>>;

    /// Probe the indexer's caps endpoint.
    async fn test(&self) -> Result<bool>;
}

/// HTTP client for one Torznab or Newznab indexer
pub struct TorznabClient {
    indexer: Indexer,
    client: Client,
    pacer: RequestPacer,
}

impl TorznabClient {
    pub fn new(indexer: Indexer) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(INDEXER_TIMEOUT_SECS))
            .user_agent("Arenarr/0.3")
            .build()
            .map_err(|e| ArenarrError::ExternalServiceError {
                service: indexer.name.clone(),
                error: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            indexer,
            client,
            pacer: RequestPacer::default(),
        })
    }

    fn api_url(&self, request_type: &str, query: Option<&str>, limit: u32) -> Result<Url> {
        let mut url =
            Url::parse(&self.indexer.base_url).map_err(|e| ArenarrError::IndexerError {
                message: format!("{}: invalid base url: {e}", self.indexer.name),
            })?;
        if !url.path().ends_with("/api") {
            url.set_path(&format!("{}/api", url.path().trim_end_matches('/')));
        }

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("t", request_type);
            if let Some(api_key) = self.indexer.api_key.as_deref() {
                pairs.append_pair("apikey", api_key);
            }
            if let Some(query) = query {
                if !query.trim().is_empty() {
                    pairs.append_pair("q", query.trim());
                }
            }
            if !self.indexer.categories.is_empty() {
                let cats = self
                    .indexer
                    .categories
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                pairs.append_pair("cat", &cats);
            }
            if limit > 0 {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    async fn execute(&self, url: Url) -> Result<String> {
        self.pacer.wait().await;
        debug!(indexer = %self.indexer.name, url = %url, "querying indexer");

        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| ArenarrError::ExternalServiceError {
                    service: self.indexer.name.clone(),
                    error: format!("request failed: {e}"),
                })?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ArenarrError::RateLimited {
                service: self.indexer.name.clone(),
                retry_after_secs,
            });
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ArenarrError::ExternalServiceError {
                service: self.indexer.name.clone(),
                error: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(ArenarrError::IndexerError {
                message: format!("{}: status {}: {}", self.indexer.name, status.as_u16(), body),
            });
        }

        Ok(body)
    }

    fn parse_feed(&self, xml: &str) -> Result<Vec<ReleaseSearchResult>> {
        let envelope: FeedEnvelope =
            from_str(xml).map_err(|e| ArenarrError::IndexerError {
                message: format!("{}: feed parse error: {e}", self.indexer.name),
            })?;

        let protocol = self.indexer.protocol.release_protocol();
        let mut releases = Vec::new();
        for item in envelope.channel.items {
            let download_url = item
                .enclosure
                .as_ref()
                .and_then(|e| e.url.clone())
                .or_else(|| item.link.clone());
            let Some(download_url) = download_url else {
                warn!(indexer = %self.indexer.name, title = %item.title, "item without download url");
                continue;
            };
            let guid = item
                .guid
                .and_then(|guid| guid.value)
                .unwrap_or_else(|| download_url.clone());

            let mut release = ReleaseSearchResult::new(
                self.indexer.id,
                self.indexer.name.clone(),
                item.title,
                guid,
                download_url,
                protocol,
            );
            release.info_url = item.comments;
            release.size_bytes = item
                .enclosure
                .as_ref()
                .and_then(|e| e.length)
                .filter(|len| *len > 0);
            release.publish_date = item.pub_date.as_deref().and_then(parse_pub_date);

            for attr in &item.attributes {
                match attr.name.as_str() {
                    "seeders" => release.seeders = attr.value.parse().ok(),
                    "peers" | "leechers" => release.leechers = attr.value.parse().ok(),
                    "infohash" => release.torrent_info_hash = Some(attr.value.to_lowercase()),
                    "size" if release.size_bytes.is_none() => {
                        release.size_bytes = attr.value.parse().ok()
                    }
                    "indexerflags" => {
                        release
                            .indexer_flags
                            .extend(attr.value.split(',').map(|f| f.trim().to_lowercase()));
                    }
                    _ => {}
                }
            }
            releases.push(release);
        }
        Ok(releases)
    }
}

#[async_trait]
impl IndexerClient for TorznabClient {
    fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<ReleaseSearchResult>> {
        let url = self.api_url("search", Some(query), limit)?;
        let xml = self.execute(url).await?;
        self.parse_feed(&xml)
    }

    async fn fetch_rss(&self, limit: u32) -> Result<Vec<ReleaseSearchResult>> {
        let url = self.api_url("search", None, limit)?;
        let xml = self.execute(url).await?;
        self.parse_feed(&xml)
    }

    async fn test(&self) -> Result<bool> {
        let url = self.api_url("caps", None, 0)?;
        let body = self.execute(url).await?;
        Ok(body.contains("<caps") || body.contains("<categories"))
    }
}

fn parse_pub_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    channel: FeedChannel,
}

#[derive(Debug, Deserialize)]
struct FeedChannel {
    #[serde(rename = "item", default)]
    items: Vec<FeedItem>,
}

/// `<guid>` may carry an `isPermaLink` attribute, so its text needs a
/// wrapper struct.
#[derive(Debug, Deserialize)]
struct FeedGuid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    title: String,
    guid: Option<FeedGuid>,
    link: Option<String>,
    comments: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    enclosure: Option<FeedEnclosure>,
    #[serde(rename = "torznab:attr", alias = "newznab:attr", alias = "attr", default)]
    attributes: Vec<FeedAttribute>,
}

#[derive(Debug, Deserialize)]
struct FeedEnclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@length")]
    length: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FeedAttribute {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@value")]
    value: String,
}

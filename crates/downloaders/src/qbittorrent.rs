//! qBittorrent Web API adapter
//!
//! Cookie-session client for qBittorrent's v2 Web API: login, torrent add,
//! status lookups, and the post-add identification ladder used to recover
//! the hash of what was just added.

use crate::{
    normalize_eta, AddDownloadErrorKind, AddDownloadResult, DownloadClient, DownloadClientStatus,
    DownloadStatusKind,
};
use arenarr_core::models::download_client::DownloadClientConfig;
use arenarr_core::{ArenarrError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// Default timeout for download-client requests.
pub const CLIENT_TIMEOUT_SECS: u64 = 100;

/// Session cookie lifetime before re-login.
const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Default)]
struct SessionState {
    authenticated: bool,
    last_auth_time: Option<std::time::Instant>,
}

/// qBittorrent Web API client
pub struct QBittorrentClient {
    config: DownloadClientConfig,
    client: Client,
    base_url: Url,
    session_state: Arc<RwLock<SessionState>>,
}

/// Torrent entry from `/api/v2/torrents/info`
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfo {
    pub hash: String,
    pub name: String,
    pub state: String,
    /// 0.0 to 1.0
    pub progress: f64,
    pub size: i64,
    pub completed: i64,
    pub eta: i64,
    pub category: String,
    pub save_path: String,
}

/// Translate a qBittorrent state string to the canonical status.
pub fn map_vendor_state(state: &str) -> DownloadStatusKind {
    match state {
        "uploading" | "stalledUP" | "pausedUP" | "queuedUP" | "checkingUP" | "forcedUP" => {
            DownloadStatusKind::Completed
        }
        "error" | "missingFiles" => DownloadStatusKind::Failed,
        "stalledDL" => DownloadStatusKind::Warning,
        "downloading" | "metaDL" | "allocating" | "checkingDL" | "forcedDL" => {
            DownloadStatusKind::Downloading
        }
        "pausedDL" => DownloadStatusKind::Paused,
        "queuedDL" | "checkingResumeData" => DownloadStatusKind::Queued,
        other => {
            debug!(state = other, "unmapped qBittorrent state");
            DownloadStatusKind::Warning
        }
    }
}

impl QBittorrentClient {
    pub fn new(config: DownloadClientConfig) -> Result<Self> {
        let base_url =
            Url::parse(&config.base_url()).map_err(|e| ArenarrError::DownloadClientError {
                client: config.name.clone(),
                error: format!("invalid base url: {e}"),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .cookie_store(true)
            .build()
            .map_err(|e| ArenarrError::DownloadClientError {
                client: config.name.clone(),
                error: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            config,
            client,
            base_url,
            session_state: Arc::new(RwLock::new(SessionState::default())),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ArenarrError::DownloadClientError {
                client: self.config.name.clone(),
                error: format!("failed to build url {path}: {e}"),
            })
    }

    async fn needs_authentication(&self) -> bool {
        let state = self.session_state.read().await;
        if !state.authenticated {
            return true;
        }
        state
            .last_auth_time
            .map(|t| t.elapsed() > SESSION_TTL)
            .unwrap_or(true)
    }

    async fn ensure_authenticated(&self) -> Result<()> {
        if self.needs_authentication().await {
            self.login().await?;
        }
        Ok(())
    }

    /// Login and establish the SID cookie session.
    pub async fn login(&self) -> Result<()> {
        let url = self.endpoint("api/v2/auth/login")?;
        let mut form = HashMap::new();
        form.insert("username", self.config.username.as_deref().unwrap_or(""));
        form.insert("password", self.config.password.as_deref().unwrap_or(""));

        debug!(client = %self.config.name, "logging in to qBittorrent");
        let response = self.client.post(url).form(&form).send().await.map_err(|e| {
            ArenarrError::DownloadClientError {
                client: self.config.name.clone(),
                error: format!("login request failed: {e}"),
            }
        })?;

        if !response.status().is_success() {
            return Err(ArenarrError::DownloadClientError {
                client: self.config.name.clone(),
                error: format!("login failed with status {}", response.status()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ArenarrError::DownloadClientError {
                client: self.config.name.clone(),
                error: format!("failed to read login response: {e}"),
            })?;
        if body.contains("Fails") {
            return Err(ArenarrError::DownloadClientError {
                client: self.config.name.clone(),
                error: "authentication failed - invalid credentials".to_string(),
            });
        }

        let mut state = self.session_state.write().await;
        state.authenticated = true;
        state.last_auth_time = Some(std::time::Instant::now());
        info!(client = %self.config.name, "logged in to qBittorrent");
        Ok(())
    }

    /// List torrents, optionally restricted to a category.
    pub async fn list_torrents(&self, category: Option<&str>) -> Result<Vec<TorrentInfo>> {
        self.ensure_authenticated().await?;
        let mut url = self.endpoint("api/v2/torrents/info")?;
        if let Some(category) = category {
            url.query_pairs_mut().append_pair("category", category);
        }
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| ArenarrError::DownloadClientError {
                    client: self.config.name.clone(),
                    error: format!("torrent list failed: {e}"),
                })?;
        response
            .json::<Vec<TorrentInfo>>()
            .await
            .map_err(|e| ArenarrError::DownloadClientError {
                client: self.config.name.clone(),
                error: format!("failed to parse torrent list: {e}"),
            })
    }

    /// Best-effort probe for torrent URLs that actually serve an HTML error
    /// page. Inconclusive probes never block the add.
    async fn looks_like_html_error_page(&self, url: &str) -> bool {
        if url.starts_with("magnet:") {
            return false;
        }
        match self.client.head(url).send().await {
            Ok(response) => response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|ct| ct.contains("text/html"))
                .unwrap_or(false),
            Err(error) => {
                debug!(%error, "torrent url pre-validation inconclusive");
                false
            }
        }
    }

    /// Identify the torrent that was just added. Strategies, best first:
    /// new hash in the category; category plus expected name; expected name
    /// among new hashes; and, only when no expected name was given, the
    /// single new torrent by elimination.
    fn identify_added(
        before: &HashSet<String>,
        after: &[TorrentInfo],
        category: &str,
        expected_name: Option<&str>,
    ) -> Option<String> {
        let new_torrents: Vec<&TorrentInfo> =
            after.iter().filter(|t| !before.contains(&t.hash)).collect();

        if let Some(found) = new_torrents.iter().find(|t| t.category == category) {
            return Some(found.hash.clone());
        }

        if let Some(expected) = expected_name {
            if let Some(found) = after
                .iter()
                .find(|t| t.category == category && titles_match(&t.name, expected))
            {
                return Some(found.hash.clone());
            }
            if let Some(found) = new_torrents.iter().find(|t| titles_match(&t.name, expected)) {
                return Some(found.hash.clone());
            }
            return None;
        }

        // Elimination is only trusted without an expected name; with several
        // callers sharing one client it can pick a stranger's torrent.
        if new_torrents.len() == 1 {
            return Some(new_torrents[0].hash.clone());
        }
        None
    }
}

/// Loose title comparison: separators and case are not significant.
fn titles_match(a: &str, b: &str) -> bool {
    let canon = |s: &str| {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .collect::<String>()
    };
    canon(a) == canon(b)
}

#[async_trait]
impl DownloadClient for QBittorrentClient {
    fn config(&self) -> &DownloadClientConfig {
        &self.config
    }

    async fn add_download(
        &self,
        url: &str,
        category: &str,
        expected_name: Option<&str>,
    ) -> Result<AddDownloadResult> {
        if let Err(error) = self.ensure_authenticated().await {
            warn!(client = %self.config.name, %error, "login failed before add");
            return Ok(AddDownloadResult::failed(
                AddDownloadErrorKind::LoginFailed,
                error.to_string(),
            ));
        }

        if self.looks_like_html_error_page(url).await {
            return Ok(AddDownloadResult::failed(
                AddDownloadErrorKind::InvalidTorrent,
                "download url serves an HTML page, torrent link is likely expired",
            ));
        }

        let before: HashSet<String> = match self.list_torrents(None).await {
            Ok(torrents) => torrents.into_iter().map(|t| t.hash).collect(),
            Err(_) => HashSet::new(),
        };

        let endpoint = self.endpoint("api/v2/torrents/add")?;
        let form = reqwest::multipart::Form::new()
            .text("urls", url.to_string())
            .text("category", category.to_string());

        let response = match self.client.post(endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(error) if error.is_timeout() => {
                return Ok(AddDownloadResult::failed(
                    AddDownloadErrorKind::Timeout,
                    error.to_string(),
                ))
            }
            Err(error) => {
                return Ok(AddDownloadResult::failed(
                    AddDownloadErrorKind::ConnectionFailed,
                    error.to_string(),
                ))
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() || body.contains("Fails") {
            return Ok(AddDownloadResult::failed(
                AddDownloadErrorKind::TorrentRejected,
                format!("add rejected: status {status}, body '{body}'"),
            ));
        }

        let after = self.list_torrents(Some(category)).await.unwrap_or_default();
        let download_id = Self::identify_added(&before, &after, category, expected_name);
        if download_id.is_none() {
            warn!(client = %self.config.name, "added torrent could not be identified yet");
        }
        Ok(AddDownloadResult::ok(download_id))
    }

    async fn get_status(&self, download_id: &str) -> Result<Option<DownloadClientStatus>> {
        let torrents = self.list_torrents(None).await?;
        Ok(torrents
            .into_iter()
            .find(|t| t.hash.eq_ignore_ascii_case(download_id))
            .map(torrent_to_status))
    }

    async fn find_by_title(
        &self,
        title: &str,
        category: &str,
    ) -> Result<Option<(DownloadClientStatus, String)>> {
        let torrents = self.list_torrents(Some(category)).await?;
        Ok(torrents
            .into_iter()
            .find(|t| titles_match(&t.name, title))
            .map(|t| {
                let hash = t.hash.clone();
                (torrent_to_status(t), hash)
            }))
    }

    async fn remove(&self, download_id: &str, delete_files: bool) -> Result<()> {
        self.ensure_authenticated().await?;
        let url = self.endpoint("api/v2/torrents/delete")?;
        let mut form = HashMap::new();
        form.insert("hashes", download_id.to_string());
        form.insert("deleteFiles", delete_files.to_string());
        self.client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ArenarrError::DownloadClientError {
                client: self.config.name.clone(),
                error: format!("remove failed: {e}"),
            })?;
        Ok(())
    }

    async fn test(&self) -> Result<bool> {
        self.login().await?;
        let url = self.endpoint("api/v2/app/version")?;
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| ArenarrError::DownloadClientError {
                    client: self.config.name.clone(),
                    error: format!("version probe failed: {e}"),
                })?;
        Ok(response.status().is_success())
    }
}

fn torrent_to_status(torrent: TorrentInfo) -> DownloadClientStatus {
    let kind = map_vendor_state(&torrent.state);
    DownloadClientStatus {
        kind,
        progress: (torrent.progress * 100.0).clamp(0.0, 100.0),
        downloaded_bytes: Some(torrent.completed),
        size_bytes: Some(torrent.size),
        time_remaining_secs: normalize_eta(torrent.eta),
        save_path: Some(torrent.save_path),
        error: match kind {
            DownloadStatusKind::Failed => Some(format!("client state '{}'", torrent.state)),
            _ => None,
        },
    }
}

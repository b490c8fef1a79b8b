//! Transmission RPC adapter
//!
//! JSON-RPC client for Transmission's single `/transmission/rpc` endpoint,
//! including the CSRF session-id dance (409 + `X-Transmission-Session-Id`).
//! Category is modelled with torrent labels.

use crate::{
    normalize_eta, AddDownloadErrorKind, AddDownloadResult, DownloadClient, DownloadClientStatus,
    DownloadStatusKind,
};
use arenarr_core::models::download_client::DownloadClientConfig;
use arenarr_core::{ArenarrError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// Transmission RPC client
pub struct TransmissionClient {
    config: DownloadClientConfig,
    client: Client,
    rpc_url: Url,
    session_id: Arc<RwLock<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct RpcTorrent {
    #[serde(rename = "hashString")]
    hash_string: String,
    name: String,
    status: i64,
    #[serde(rename = "percentDone")]
    percent_done: f64,
    #[serde(rename = "totalSize")]
    total_size: i64,
    #[serde(rename = "downloadedEver")]
    downloaded_ever: i64,
    eta: i64,
    #[serde(rename = "downloadDir")]
    download_dir: String,
    #[serde(rename = "errorString", default)]
    error_string: String,
    #[serde(default)]
    labels: Vec<String>,
}

/// Translate a Transmission status code to the canonical status.
pub fn map_vendor_state(status: i64, percent_done: f64, error_string: &str) -> DownloadStatusKind {
    if !error_string.is_empty() {
        return DownloadStatusKind::Failed;
    }
    match status {
        0 => {
            if percent_done >= 1.0 {
                DownloadStatusKind::Completed
            } else {
                DownloadStatusKind::Paused
            }
        }
        1 | 2 | 3 => DownloadStatusKind::Queued,
        4 => DownloadStatusKind::Downloading,
        5 | 6 => DownloadStatusKind::Completed,
        _ => DownloadStatusKind::Warning,
    }
}

impl TransmissionClient {
    pub fn new(config: DownloadClientConfig) -> Result<Self> {
        let rpc_url = Url::parse(&format!("{}/transmission/rpc", config.base_url())).map_err(
            |e| ArenarrError::DownloadClientError {
                client: config.name.clone(),
                error: format!("invalid base url: {e}"),
            },
        )?;
        let client = Client::builder()
            .timeout(Duration::from_secs(crate::qbittorrent::CLIENT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ArenarrError::DownloadClientError {
                client: config.name.clone(),
                error: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            config,
            client,
            rpc_url,
            session_id: Arc::new(RwLock::new(None)),
        })
    }

    /// Execute one RPC call, retrying once on a 409 session-id challenge.
    async fn rpc(&self, body: serde_json::Value) -> Result<RpcResponse> {
        for attempt in 0..2 {
            let mut request = self.client.post(self.rpc_url.clone()).json(&body);
            if let (Some(user), Some(pass)) =
                (self.config.username.as_deref(), self.config.password.as_deref())
            {
                request = request.basic_auth(user, Some(pass));
            }
            if let Some(session_id) = self.session_id.read().await.clone() {
                request = request.header(SESSION_ID_HEADER, session_id);
            }

            let response =
                request
                    .send()
                    .await
                    .map_err(|e| ArenarrError::DownloadClientError {
                        client: self.config.name.clone(),
                        error: format!("rpc request failed: {e}"),
                    })?;

            if response.status() == StatusCode::CONFLICT && attempt == 0 {
                let fresh = response
                    .headers()
                    .get(SESSION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                debug!(client = %self.config.name, "refreshing transmission session id");
                *self.session_id.write().await = fresh;
                continue;
            }

            if !response.status().is_success() {
                return Err(ArenarrError::DownloadClientError {
                    client: self.config.name.clone(),
                    error: format!("rpc failed with status {}", response.status()),
                });
            }

            return response.json::<RpcResponse>().await.map_err(|e| {
                ArenarrError::DownloadClientError {
                    client: self.config.name.clone(),
                    error: format!("failed to parse rpc response: {e}"),
                }
            });
        }
        Err(ArenarrError::DownloadClientError {
            client: self.config.name.clone(),
            error: "session id negotiation failed".to_string(),
        })
    }

    async fn list_torrents(&self) -> Result<Vec<RpcTorrent>> {
        let response = self
            .rpc(json!({
                "method": "torrent-get",
                "arguments": {
                    "fields": [
                        "hashString", "name", "status", "percentDone", "totalSize",
                        "downloadedEver", "eta", "downloadDir", "errorString", "labels"
                    ]
                }
            }))
            .await?;
        let torrents = response
            .arguments
            .get("torrents")
            .cloned()
            .unwrap_or_else(|| json!([]));
        serde_json::from_value(torrents).map_err(|e| ArenarrError::DownloadClientError {
            client: self.config.name.clone(),
            error: format!("failed to parse torrent list: {e}"),
        })
    }
}

#[async_trait]
impl DownloadClient for TransmissionClient {
    fn config(&self) -> &DownloadClientConfig {
        &self.config
    }

    async fn add_download(
        &self,
        url: &str,
        category: &str,
        _expected_name: Option<&str>,
    ) -> Result<AddDownloadResult> {
        let response = match self
            .rpc(json!({
                "method": "torrent-add",
                "arguments": { "filename": url, "labels": [category] }
            }))
            .await
        {
            Ok(response) => response,
            Err(error) => {
                return Ok(AddDownloadResult::failed(
                    AddDownloadErrorKind::ConnectionFailed,
                    error.to_string(),
                ))
            }
        };

        if response.result != "success" {
            let kind = if response.result.contains("duplicate") {
                AddDownloadErrorKind::TorrentRejected
            } else if response.result.contains("invalid") {
                AddDownloadErrorKind::InvalidTorrent
            } else {
                AddDownloadErrorKind::Unknown
            };
            return Ok(AddDownloadResult::failed(kind, response.result));
        }

        let added = response
            .arguments
            .get("torrent-added")
            .or_else(|| response.arguments.get("torrent-duplicate"))
            .and_then(|t| t.get("hashString"))
            .and_then(|h| h.as_str())
            .map(|h| h.to_string());
        Ok(AddDownloadResult::ok(added))
    }

    async fn get_status(&self, download_id: &str) -> Result<Option<DownloadClientStatus>> {
        let torrents = self.list_torrents().await?;
        Ok(torrents
            .into_iter()
            .find(|t| t.hash_string.eq_ignore_ascii_case(download_id))
            .map(torrent_to_status))
    }

    async fn find_by_title(
        &self,
        title: &str,
        category: &str,
    ) -> Result<Option<(DownloadClientStatus, String)>> {
        let torrents = self.list_torrents().await?;
        Ok(torrents
            .into_iter()
            .filter(|t| t.labels.iter().any(|l| l == category))
            .find(|t| t.name.eq_ignore_ascii_case(title))
            .map(|t| {
                let hash = t.hash_string.clone();
                (torrent_to_status(t), hash)
            }))
    }

    async fn remove(&self, download_id: &str, delete_files: bool) -> Result<()> {
        self.rpc(json!({
            "method": "torrent-remove",
            "arguments": { "ids": [download_id], "delete-local-data": delete_files }
        }))
        .await?;
        Ok(())
    }

    async fn test(&self) -> Result<bool> {
        let response = self.rpc(json!({ "method": "session-get" })).await?;
        Ok(response.result == "success")
    }
}

fn torrent_to_status(torrent: RpcTorrent) -> DownloadClientStatus {
    let kind = map_vendor_state(torrent.status, torrent.percent_done, &torrent.error_string);
    DownloadClientStatus {
        kind,
        progress: (torrent.percent_done * 100.0).clamp(0.0, 100.0),
        downloaded_bytes: Some(torrent.downloaded_ever),
        size_bytes: Some(torrent.total_size),
        time_remaining_secs: normalize_eta(torrent.eta),
        save_path: Some(torrent.download_dir),
        error: if torrent.error_string.is_empty() {
            None
        } else {
            Some(torrent.error_string)
        },
    }
}

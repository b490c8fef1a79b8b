//! SABnzbd API adapter
//!
//! Usenet client over SABnzbd's `api` endpoint: NZB add by URL, queue and
//! history lookups, and the vendor status mapping for both.

use crate::{
    AddDownloadErrorKind, AddDownloadResult, DownloadClient, DownloadClientStatus,
    DownloadStatusKind,
};
use arenarr_core::models::download_client::DownloadClientConfig;
use arenarr_core::{ArenarrError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// SABnzbd API client
pub struct SabnzbdClient {
    config: DownloadClientConfig,
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    status: bool,
    #[serde(default)]
    nzo_ids: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueResponse {
    queue: QueueBody,
}

#[derive(Debug, Deserialize)]
struct QueueBody {
    #[serde(default)]
    slots: Vec<QueueSlot>,
}

#[derive(Debug, Clone, Deserialize)]
struct QueueSlot {
    nzo_id: String,
    filename: String,
    status: String,
    /// Percentage as a string, e.g. "42.5"
    percentage: String,
    #[serde(default)]
    mb: String,
    #[serde(default)]
    mbleft: String,
    #[serde(default)]
    timeleft: String,
    #[serde(default)]
    cat: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: HistoryBody,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(default)]
    slots: Vec<HistorySlot>,
}

#[derive(Debug, Clone, Deserialize)]
struct HistorySlot {
    nzo_id: String,
    name: String,
    status: String,
    #[serde(default)]
    fail_message: String,
    #[serde(default)]
    storage: String,
    #[serde(default)]
    bytes: i64,
    #[serde(default)]
    category: String,
}

/// Translate a SABnzbd queue status to the canonical status.
pub fn map_queue_state(status: &str) -> DownloadStatusKind {
    match status.to_lowercase().as_str() {
        "downloading" | "fetching" => DownloadStatusKind::Downloading,
        "paused" => DownloadStatusKind::Paused,
        "queued" | "grabbing" => DownloadStatusKind::Queued,
        "checking" | "verifying" | "repairing" | "extracting" => DownloadStatusKind::Downloading,
        _ => DownloadStatusKind::Warning,
    }
}

/// Translate a SABnzbd history status to the canonical status.
pub fn map_history_state(status: &str) -> DownloadStatusKind {
    match status.to_lowercase().as_str() {
        "completed" => DownloadStatusKind::Completed,
        "failed" => DownloadStatusKind::Failed,
        _ => DownloadStatusKind::Downloading,
    }
}

impl SabnzbdClient {
    pub fn new(config: DownloadClientConfig) -> Result<Self> {
        let base_url =
            Url::parse(&config.base_url()).map_err(|e| ArenarrError::DownloadClientError {
                client: config.name.clone(),
                error: format!("invalid base url: {e}"),
            })?;
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
            base_url,
        })
    }

    fn api_url(&self, mode: &str, extra: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join("api")
            .map_err(|e| ArenarrError::DownloadClientError {
                client: self.config.name.clone(),
                error: format!("failed to build api url: {e}"),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("mode", mode);
            pairs.append_pair("output", "json");
            if let Some(api_key) = self.config.api_key.as_deref() {
                pairs.append_pair("apikey", api_key);
            }
            for (key, value) in extra {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| ArenarrError::DownloadClientError {
                    client: self.config.name.clone(),
                    error: format!("request failed: {e}"),
                })?;
        if !response.status().is_success() {
            return Err(ArenarrError::DownloadClientError {
                client: self.config.name.clone(),
                error: format!("request failed with status {}", response.status()),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ArenarrError::DownloadClientError {
                client: self.config.name.clone(),
                error: format!("failed to parse response: {e}"),
            })
    }

    fn queue_slot_to_status(slot: &QueueSlot) -> DownloadClientStatus {
        let total_mb: f64 = slot.mb.parse().unwrap_or(0.0);
        let left_mb: f64 = slot.mbleft.parse().unwrap_or(0.0);
        let size_bytes = (total_mb * 1024.0 * 1024.0) as i64;
        let downloaded_bytes = ((total_mb - left_mb).max(0.0) * 1024.0 * 1024.0) as i64;
        DownloadClientStatus {
            kind: map_queue_state(&slot.status),
            progress: slot.percentage.parse().unwrap_or(0.0),
            downloaded_bytes: Some(downloaded_bytes),
            size_bytes: Some(size_bytes),
            time_remaining_secs: parse_timeleft(&slot.timeleft),
            save_path: None,
            error: None,
        }
    }

    fn history_slot_to_status(slot: &HistorySlot) -> DownloadClientStatus {
        let kind = map_history_state(&slot.status);
        DownloadClientStatus {
            kind,
            progress: if kind == DownloadStatusKind::Completed {
                100.0
            } else {
                0.0
            },
            downloaded_bytes: Some(slot.bytes),
            size_bytes: Some(slot.bytes),
            time_remaining_secs: None,
            save_path: if slot.storage.is_empty() {
                None
            } else {
                Some(slot.storage.clone())
            },
            error: if slot.fail_message.is_empty() {
                None
            } else {
                Some(slot.fail_message.clone())
            },
        }
    }
}

/// Parse SABnzbd's `HH:MM:SS` time-left format.
fn parse_timeleft(value: &str) -> Option<i64> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: i64 = parts[0].parse().ok()?;
    let minutes: i64 = parts[1].parse().ok()?;
    let seconds: i64 = parts[2].parse().ok()?;
    let total = hours * 3600 + minutes * 60 + seconds;
    (total > 0).then_some(total)
}

#[async_trait]
impl DownloadClient for SabnzbdClient {
    fn config(&self) -> &DownloadClientConfig {
        &self.config
    }

    async fn add_download(
        &self,
        url: &str,
        category: &str,
        _expected_name: Option<&str>,
    ) -> Result<AddDownloadResult> {
        let api_url = self.api_url("addurl", &[("name", url), ("cat", category)])?;
        let response: AddResponse = match self.get_json(api_url).await {
            Ok(response) => response,
            Err(error) => {
                return Ok(AddDownloadResult::failed(
                    AddDownloadErrorKind::ConnectionFailed,
                    error.to_string(),
                ))
            }
        };

        if !response.status {
            let message = response.error.unwrap_or_else(|| "add rejected".to_string());
            let kind = if message.to_lowercase().contains("api key") {
                AddDownloadErrorKind::LoginFailed
            } else {
                AddDownloadErrorKind::TorrentRejected
            };
            return Ok(AddDownloadResult::failed(kind, message));
        }

        Ok(AddDownloadResult::ok(response.nzo_ids.into_iter().next()))
    }

    async fn get_status(&self, download_id: &str) -> Result<Option<DownloadClientStatus>> {
        let queue: QueueResponse = self.get_json(self.api_url("queue", &[])?).await?;
        if let Some(slot) = queue.queue.slots.iter().find(|s| s.nzo_id == download_id) {
            return Ok(Some(Self::queue_slot_to_status(slot)));
        }

        let history: HistoryResponse = self.get_json(self.api_url("history", &[])?).await?;
        Ok(history
            .history
            .slots
            .iter()
            .find(|s| s.nzo_id == download_id)
            .map(Self::history_slot_to_status))
    }

    async fn find_by_title(
        &self,
        title: &str,
        category: &str,
    ) -> Result<Option<(DownloadClientStatus, String)>> {
        let queue: QueueResponse = self.get_json(self.api_url("queue", &[])?).await?;
        if let Some(slot) = queue
            .queue
            .slots
            .iter()
            .find(|s| s.cat == category && s.filename.eq_ignore_ascii_case(title))
        {
            return Ok(Some((
                Self::queue_slot_to_status(slot),
                slot.nzo_id.clone(),
            )));
        }

        let history: HistoryResponse = self.get_json(self.api_url("history", &[])?).await?;
        Ok(history
            .history
            .slots
            .iter()
            .find(|s| s.category == category && s.name.eq_ignore_ascii_case(title))
            .map(|s| (Self::history_slot_to_status(s), s.nzo_id.clone())))
    }

    async fn remove(&self, download_id: &str, delete_files: bool) -> Result<()> {
        let del_files = if delete_files { "1" } else { "0" };
        let url = self.api_url(
            "queue",
            &[("name", "delete"), ("value", download_id), ("del_files", del_files)],
        )?;
        let _: serde_json::Value = self.get_json(url).await?;
        Ok(())
    }

    async fn test(&self) -> Result<bool> {
        let url = self.api_url("version", &[])?;
        let version: serde_json::Value = self.get_json(url).await?;
        Ok(version.get("version").is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenarr_core::models::download_client::DownloadClientKind;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server_config(server: &MockServer) -> DownloadClientConfig {
        let uri = Url::parse(&server.uri()).unwrap();
        let mut config = DownloadClientConfig::new(
            "sab".to_string(),
            DownloadClientKind::Sabnzbd,
            uri.host_str().unwrap().to_string(),
            uri.port().unwrap(),
        );
        config.api_key = Some("sab-key".to_string());
        config
    }

    #[test]
    fn queue_and_history_state_mapping() {
        assert_eq!(map_queue_state("Downloading"), DownloadStatusKind::Downloading);
        assert_eq!(map_queue_state("Paused"), DownloadStatusKind::Paused);
        assert_eq!(map_queue_state("Queued"), DownloadStatusKind::Queued);
        assert_eq!(map_history_state("Completed"), DownloadStatusKind::Completed);
        assert_eq!(map_history_state("Failed"), DownloadStatusKind::Failed);
    }

    #[test]
    fn timeleft_parsing() {
        assert_eq!(parse_timeleft("0:10:30"), Some(630));
        assert_eq!(parse_timeleft("0:00:00"), None);
        assert_eq!(parse_timeleft("soon"), None);
    }

    #[tokio::test]
    async fn add_url_returns_nzo_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("mode", "addurl"))
            .and(query_param("apikey", "sab-key"))
            .and(query_param("cat", "arenarr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "nzo_ids": ["SABnzbd_nzo_12345"]
            })))
            .mount(&server)
            .await;

        let client = SabnzbdClient::new(server_config(&server)).unwrap();
        let result = client
            .add_download("https://nzb.example/1.nzb", "arenarr", None)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.download_id.as_deref(), Some("SABnzbd_nzo_12345"));
    }

    #[tokio::test]
    async fn completed_history_entry_resolves_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("mode", "queue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "queue": { "slots": [] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("mode", "history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "history": { "slots": [{
                    "nzo_id": "SABnzbd_nzo_12345",
                    "name": "UFC.310.2024.1080p",
                    "status": "Completed",
                    "storage": "/downloads/complete/UFC.310.2024.1080p",
                    "bytes": 4294967296i64,
                    "category": "arenarr"
                }] }
            })))
            .mount(&server)
            .await;

        let client = SabnzbdClient::new(server_config(&server)).unwrap();
        let status = client.get_status("SABnzbd_nzo_12345").await.unwrap().unwrap();
        assert_eq!(status.kind, DownloadStatusKind::Completed);
        assert_eq!(
            status.save_path.as_deref(),
            Some("/downloads/complete/UFC.310.2024.1080p")
        );
    }
}

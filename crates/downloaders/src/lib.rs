//! Arenarr download clients
//!
//! Vendor adapters behind one `DownloadClient` capability set, canonical
//! status mapping, and the dispatcher that pushes a chosen release to the
//! best available client and persists the queue item.

pub mod dispatch;
pub mod qbittorrent;
pub mod sabnzbd;
pub mod transmission;

use arenarr_core::models::download_client::DownloadClientConfig;
use arenarr_core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use dispatch::DownloadDispatcher;
pub use qbittorrent::QBittorrentClient;
pub use sabnzbd::SabnzbdClient;
pub use transmission::TransmissionClient;

/// Vendor ETA sentinel meaning "unknown" (qBittorrent reports 8640000s).
pub const ETA_INFINITY_SECS: i64 = 8_640_000;

/// Collapse vendor "infinity" ETAs and non-positive values to `None`.
pub fn normalize_eta(eta: i64) -> Option<i64> {
    if eta <= 0 || eta >= ETA_INFINITY_SECS {
        None
    } else {
        Some(eta)
    }
}

/// Canonical download state, translated from vendor status strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadStatusKind {
    Queued,
    Downloading,
    Paused,
    /// Progressing states that need attention (stalled, no metadata)
    Warning,
    Completed,
    Failed,
}

/// Canonical view of one download inside a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadClientStatus {
    pub kind: DownloadStatusKind,
    /// 0.0 to 100.0
    pub progress: f64,
    pub downloaded_bytes: Option<i64>,
    pub size_bytes: Option<i64>,
    pub time_remaining_secs: Option<i64>,
    pub save_path: Option<String>,
    pub error: Option<String>,
}

/// Why an add failed, surfaced to the user as a structured reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddDownloadErrorKind {
    InvalidTorrent,
    TorrentRejected,
    LoginFailed,
    ConnectionFailed,
    Timeout,
    Unknown,
}

impl std::fmt::Display for AddDownloadErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddDownloadErrorKind::InvalidTorrent => write!(f, "invalid torrent"),
            AddDownloadErrorKind::TorrentRejected => write!(f, "torrent rejected"),
            AddDownloadErrorKind::LoginFailed => write!(f, "login failed"),
            AddDownloadErrorKind::ConnectionFailed => write!(f, "connection failed"),
            AddDownloadErrorKind::Timeout => write!(f, "timeout"),
            AddDownloadErrorKind::Unknown => write!(f, "unknown error"),
        }
    }
}

/// Outcome of pushing a download to a client
#[derive(Debug, Clone)]
pub struct AddDownloadResult {
    pub success: bool,
    /// Vendor-opaque id (torrent hash, NZB id) when identification succeeded
    pub download_id: Option<String>,
    pub error: Option<AddDownloadErrorKind>,
    pub message: Option<String>,
}

impl AddDownloadResult {
    pub fn ok(download_id: Option<String>) -> Self {
        Self {
            success: true,
            download_id,
            error: None,
            message: None,
        }
    }

    pub fn failed(error: AddDownloadErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            download_id: None,
            error: Some(error),
            message: Some(message.into()),
        }
    }
}

/// Capability set every download client vendor adapter implements
#[async_trait]
pub trait DownloadClient: Send + Sync {
    fn config(&self) -> &DownloadClientConfig;

    /// Push a download URL to the client under a category. `expected_name`
    /// drives post-add identification and should always be provided.
    async fn add_download(
        &self,
        url: &str,
        category: &str,
        expected_name: Option<&str>,
    ) -> Result<AddDownloadResult>;

    /// Status by vendor id; `None` when the client no longer knows the id.
    async fn get_status(&self, download_id: &str) -> Result<Option<DownloadClientStatus>>;

    /// Fallback lookup by title within a category, for identity-shifting
    /// fronts that rewrite ids.
    async fn find_by_title(
        &self,
        title: &str,
        category: &str,
    ) -> Result<Option<(DownloadClientStatus, String)>>;

    async fn remove(&self, download_id: &str, delete_files: bool) -> Result<()>;

    async fn test(&self) -> Result<bool>;
}

//! Download client configuration

use super::release::ReleaseProtocol;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported download client vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadClientKind {
    QBittorrent,
    Transmission,
    Deluge,
    Sabnzbd,
    Nzbget,
}

impl DownloadClientKind {
    pub fn protocol(&self) -> ReleaseProtocol {
        match self {
            DownloadClientKind::QBittorrent
            | DownloadClientKind::Transmission
            | DownloadClientKind::Deluge => ReleaseProtocol::Torrent,
            DownloadClientKind::Sabnzbd | DownloadClientKind::Nzbget => ReleaseProtocol::Usenet,
        }
    }
}

impl std::fmt::Display for DownloadClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadClientKind::QBittorrent => write!(f, "qbittorrent"),
            DownloadClientKind::Transmission => write!(f, "transmission"),
            DownloadClientKind::Deluge => write!(f, "deluge"),
            DownloadClientKind::Sabnzbd => write!(f, "sabnzbd"),
            DownloadClientKind::Nzbget => write!(f, "nzbget"),
        }
    }
}

impl std::str::FromStr for DownloadClientKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "qbittorrent" => Ok(DownloadClientKind::QBittorrent),
            "transmission" => Ok(DownloadClientKind::Transmission),
            "deluge" => Ok(DownloadClientKind::Deluge),
            "sabnzbd" => Ok(DownloadClientKind::Sabnzbd),
            "nzbget" => Ok(DownloadClientKind::Nzbget),
            other => Err(format!("unknown download client kind: '{other}'")),
        }
    }
}

/// Configuration of one download client instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadClientConfig {
    pub id: i32,
    pub name: String,
    pub kind: DownloadClientKind,
    pub enabled: bool,
    /// Lower value = preferred when several clients back the same protocol
    pub priority: i32,
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    /// Category/label assigned to dispatched downloads
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DownloadClientConfig {
    pub fn new(name: String, kind: DownloadClientKind, host: String, port: u16) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            kind,
            enabled: true,
            priority: 1,
            host,
            port,
            use_ssl: false,
            username: None,
            password: None,
            api_key: None,
            category: "arenarr".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn protocol(&self) -> ReleaseProtocol {
        self.kind.protocol()
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

//! Library placement models: root folders, remote path mappings and
//! import history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A configured destination directory for imported media
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootFolder {
    pub id: i32,
    pub path: String,
}

/// Translation from a download-client-reported path to a locally accessible
/// one. Longest matching remote prefix wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePathMapping {
    pub id: i32,
    /// Host of the download client this mapping applies to
    pub host: String,
    pub remote_path: String,
    pub local_path: String,
}

impl RemotePathMapping {
    /// Apply the best mapping for `host` to `path`. Returns the path
    /// unchanged when no mapping matches.
    pub fn resolve(mappings: &[RemotePathMapping], host: &str, path: &str) -> String {
        let mut best: Option<&RemotePathMapping> = None;
        for mapping in mappings {
            if !mapping.host.eq_ignore_ascii_case(host) {
                continue;
            }
            if !path.starts_with(&mapping.remote_path) {
                continue;
            }
            if best
                .map(|b| mapping.remote_path.len() > b.remote_path.len())
                .unwrap_or(true)
            {
                best = Some(mapping);
            }
        }
        match best {
            Some(mapping) => format!(
                "{}{}",
                mapping.local_path,
                &path[mapping.remote_path.len()..]
            ),
            None => path.to_string(),
        }
    }
}

/// Record of one import attempt, successful or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportHistory {
    pub id: Uuid,
    pub event_id: Uuid,
    pub event_file_id: Option<Uuid>,
    pub source_path: String,
    pub destination_path: Option<String>,
    pub quality: Option<String>,
    /// Outcome summary, e.g. `"imported"` or the failure reason
    pub decision: String,
    pub imported_at: DateTime<Utc>,
}

impl ImportHistory {
    pub fn imported(
        event_id: Uuid,
        event_file_id: Uuid,
        source_path: String,
        destination_path: String,
        quality: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            event_file_id: Some(event_file_id),
            source_path,
            destination_path: Some(destination_path),
            quality,
            decision: "imported".to_string(),
            imported_at: Utc::now(),
        }
    }

    pub fn failed(event_id: Uuid, source_path: String, reason: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            event_file_id: None,
            source_path,
            destination_path: None,
            quality: None,
            decision: reason,
            imported_at: Utc::now(),
        }
    }
}

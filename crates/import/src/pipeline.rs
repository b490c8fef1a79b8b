//! Import pipeline
//!
//! Orchestrates one import: path mapping, video file selection, free-space
//! preflight, root-folder choice, naming, transfer, and the EventFile plus
//! history records. Failures leave the source download intact.

use crate::naming::NameBuilder;
use crate::space::SpaceProbe;
use crate::transfer::{FileTransfer, TransferMode};
use crate::is_video_file;
use arenarr_core::domain::repositories::{
    EventFileRepository, EventRepository, HistoryRepository, MediaManagementRepository,
};
use arenarr_core::models::event::{Event, EventFile};
use arenarr_core::models::library::{ImportHistory, RemotePathMapping, RootFolder};
use arenarr_core::{ArenarrError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Import behavior switches, sourced from media-management settings
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub use_hardlinks: bool,
    pub minimum_free_space_mb: u64,
    pub skip_free_space_check: bool,
    /// Delete the source file (and empty parent directory) after import
    pub delete_source_after_import: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            use_hardlinks: true,
            minimum_free_space_mb: 100,
            skip_free_space_check: false,
            delete_source_after_import: false,
        }
    }
}

/// One import job, produced by the download monitor
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub client_host: String,
    /// Save path as reported by the download client
    pub vendor_save_path: String,
    pub quality: Option<String>,
    pub part_name: Option<String>,
    pub part_number: Option<i32>,
}

/// Successful import result
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub event_file: EventFile,
    pub destination: PathBuf,
    pub mode: TransferMode,
}

/// The import pipeline
pub struct ImportPipeline {
    config: ImportConfig,
    transfer: FileTransfer,
    name_builder: Arc<dyn NameBuilder>,
    space_probe: Arc<dyn SpaceProbe>,
    media: Arc<dyn MediaManagementRepository>,
    events: Arc<dyn EventRepository>,
    event_files: Arc<dyn EventFileRepository>,
    history: Arc<dyn HistoryRepository>,
}

impl ImportPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ImportConfig,
        name_builder: Arc<dyn NameBuilder>,
        space_probe: Arc<dyn SpaceProbe>,
        media: Arc<dyn MediaManagementRepository>,
        events: Arc<dyn EventRepository>,
        event_files: Arc<dyn EventFileRepository>,
        history: Arc<dyn HistoryRepository>,
    ) -> Self {
        let transfer = FileTransfer::new(config.use_hardlinks);
        Self {
            config,
            transfer,
            name_builder,
            space_probe,
            media,
            events,
            event_files,
            history,
        }
    }

    /// Import the completed download described by `request` for `event`.
    pub async fn import(&self, event: &Event, request: &ImportRequest) -> Result<ImportOutcome> {
        match self.import_inner(event, request).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                let record = ImportHistory::failed(
                    event.id,
                    request.vendor_save_path.clone(),
                    error.to_string(),
                );
                if let Err(history_error) = self.history.record(&record).await {
                    warn!(%history_error, "failed to record import failure");
                }
                Err(error)
            }
        }
    }

    async fn import_inner(&self, event: &Event, request: &ImportRequest) -> Result<ImportOutcome> {
        // 1. Translate the vendor-reported path to one we can reach
        let mappings = self.media.list_remote_path_mappings().await?;
        let local_path = RemotePathMapping::resolve(
            &mappings,
            &request.client_host,
            &request.vendor_save_path,
        );
        let local_path = PathBuf::from(local_path);

        // 2. Pick the payload: the largest allowed video file
        let (source, source_size) = largest_video_file(&local_path).ok_or_else(|| {
            ArenarrError::ImportError {
                operation: "scan".to_string(),
                message: format!("no video file found under {}", local_path.display()),
            }
        })?;

        // 3 & 4. Choose a root folder with room for the file
        let root_folders = self.media.list_root_folders().await?;
        let root = self.pick_root_folder(&root_folders, source_size)?;

        // 5 & 6. Build a collision-free destination path
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mkv");
        let folder = self.name_builder.folder_name(event);
        let file_name = self.name_builder.file_name(
            event,
            request.quality.as_deref(),
            request.part_name.as_deref(),
            request.part_number,
            extension,
        );
        let destination = unique_destination(&Path::new(&root.path).join(folder).join(file_name));

        // 7. Transfer
        let outcome = self.transfer.transfer(&source, &destination, false).await?;

        // 8. Records
        let mut event_file = EventFile::new(
            event.id,
            destination.display().to_string(),
            source_size as i64,
            request.quality.clone().unwrap_or_else(|| "Unknown".to_string()),
        );
        event_file.part_name = request.part_name.clone();
        event_file.part_number = request.part_number;
        self.event_files.add(&event_file).await?;

        let mut updated_event = event.clone();
        updated_event.has_file = true;
        updated_event.touch();
        self.events.update(&updated_event).await?;

        self.history
            .record(&ImportHistory::imported(
                event.id,
                event_file.id,
                source.display().to_string(),
                destination.display().to_string(),
                request.quality.clone(),
            ))
            .await?;

        if self.config.delete_source_after_import && outcome.mode != TransferMode::Hardlink {
            remove_source(&source).await;
        }

        info!(
            event = %event.title,
            destination = %destination.display(),
            mode = ?outcome.mode,
            "import complete"
        );

        Ok(ImportOutcome {
            event_file,
            destination,
            mode: outcome.mode,
        })
    }

    /// Accessible root folder with enough free space, preferring the one
    /// with the most room.
    fn pick_root_folder<'a>(
        &self,
        root_folders: &'a [RootFolder],
        file_size: u64,
    ) -> Result<&'a RootFolder> {
        let required = file_size + self.config.minimum_free_space_mb * 1024 * 1024;
        let mut best: Option<(&RootFolder, u64)> = None;

        for root in root_folders {
            let path = Path::new(&root.path);
            if !self.space_probe.is_accessible(path) {
                warn!(root = %root.path, "root folder is not accessible");
                continue;
            }
            let free = self.space_probe.free_space_bytes(path);
            if !self.config.skip_free_space_check {
                match free {
                    Some(free) if free < required => {
                        warn!(
                            root = %root.path,
                            free,
                            required,
                            "root folder lacks free space"
                        );
                        continue;
                    }
                    _ => {}
                }
            }
            let free = free.unwrap_or(0);
            if best.map(|(_, best_free)| free > best_free).unwrap_or(true) {
                best = Some((root, free));
            }
        }

        best.map(|(root, _)| root).ok_or_else(|| ArenarrError::ImportError {
            operation: "root_folder".to_string(),
            message: "no accessible root folder with sufficient free space".to_string(),
        })
    }
}

/// The largest allowed video file at or under `path`.
fn largest_video_file(path: &Path) -> Option<(PathBuf, u64)> {
    if path.is_file() {
        if !is_video_file(path) {
            return None;
        }
        let size = std::fs::metadata(path).ok()?.len();
        return Some((path.to_path_buf(), size));
    }

    let mut best: Option<(PathBuf, u64)> = None;
    let mut stack = vec![path.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let entry_path = entry.path();
            if entry_path.is_dir() {
                stack.push(entry_path);
            } else if is_video_file(&entry_path) {
                if let Ok(metadata) = entry.metadata() {
                    let size = metadata.len();
                    if best.as_ref().map(|(_, b)| size > *b).unwrap_or(true) {
                        best = Some((entry_path, size));
                    }
                }
            }
        }
    }
    best
}

/// Append ` (1)`, ` (2)`, ... before the extension until the path is free.
fn unique_destination(candidate: &Path) -> PathBuf {
    if !candidate.exists() {
        return candidate.to_path_buf();
    }
    let stem = candidate
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("import");
    let extension = candidate.extension().and_then(|e| e.to_str());
    let parent = candidate.parent().unwrap_or_else(|| Path::new("."));

    for n in 1.. {
        let name = match extension {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let next = parent.join(name);
        if !next.exists() {
            return next;
        }
    }
    unreachable!("suffix search is unbounded")
}

async fn remove_source(source: &Path) {
    if let Err(error) = tokio::fs::remove_file(source).await {
        warn!(%error, source = %source.display(), "failed to delete source after import");
        return;
    }
    if let Some(parent) = source.parent() {
        // Only empty parents are removed; remove_dir refuses otherwise
        let _ = tokio::fs::remove_dir(parent).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::DefaultNameBuilder;
    use arenarr_core::models::event::Sport;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use uuid::Uuid;

    struct FakeProbe {
        free: Option<u64>,
    }

    impl SpaceProbe for FakeProbe {
        fn free_space_bytes(&self, _path: &Path) -> Option<u64> {
            self.free
        }

        fn is_accessible(&self, path: &Path) -> bool {
            path.exists()
        }
    }

    #[derive(Default)]
    struct FakeMedia {
        roots: Vec<RootFolder>,
        mappings: Vec<RemotePathMapping>,
    }

    #[async_trait]
    impl MediaManagementRepository for FakeMedia {
        async fn list_root_folders(&self) -> Result<Vec<RootFolder>> {
            Ok(self.roots.clone())
        }

        async fn list_remote_path_mappings(&self) -> Result<Vec<RemotePathMapping>> {
            Ok(self.mappings.clone())
        }
    }

    #[derive(Default)]
    struct FakeEvents {
        updated: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventRepository for FakeEvents {
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Event>> {
            Ok(None)
        }

        async fn find_monitored(&self) -> Result<Vec<Event>> {
            Ok(vec![])
        }

        async fn create(&self, _event: &Event) -> Result<()> {
            Ok(())
        }

        async fn update(&self, event: &Event) -> Result<()> {
            self.updated.lock().unwrap().push(event.clone());
            Ok(())
        }

        async fn update_last_search_time(&self, _id: Uuid, _when: DateTime<Utc>) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeEventFiles {
        files: Mutex<Vec<EventFile>>,
    }

    #[async_trait]
    impl EventFileRepository for FakeEventFiles {
        async fn add(&self, file: &EventFile) -> Result<()> {
            self.files.lock().unwrap().push(file.clone());
            Ok(())
        }

        async fn find_by_event(&self, _event_id: Uuid) -> Result<Vec<EventFile>> {
            Ok(self.files.lock().unwrap().clone())
        }

        async fn set_exists(
            &self,
            _id: Uuid,
            _exists: bool,
            _verified: DateTime<Utc>,
        ) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _id: Uuid) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeHistory {
        records: Mutex<Vec<ImportHistory>>,
    }

    #[async_trait]
    impl HistoryRepository for FakeHistory {
        async fn record(&self, history: &ImportHistory) -> Result<()> {
            self.records.lock().unwrap().push(history.clone());
            Ok(())
        }
    }

    struct Harness {
        pipeline: ImportPipeline,
        events: Arc<FakeEvents>,
        event_files: Arc<FakeEventFiles>,
        history: Arc<FakeHistory>,
        _downloads: TempDir,
        library: TempDir,
    }

    fn harness(free_space: Option<u64>) -> Harness {
        let downloads = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        let media = Arc::new(FakeMedia {
            roots: vec![RootFolder {
                id: 1,
                path: library.path().display().to_string(),
            }],
            mappings: vec![],
        });
        let events = Arc::new(FakeEvents::default());
        let event_files = Arc::new(FakeEventFiles::default());
        let history = Arc::new(FakeHistory::default());

        let pipeline = ImportPipeline::new(
            ImportConfig {
                use_hardlinks: true,
                minimum_free_space_mb: 1,
                skip_free_space_check: false,
                delete_source_after_import: false,
            },
            Arc::new(DefaultNameBuilder),
            Arc::new(FakeProbe { free: free_space }),
            media,
            Arc::clone(&events) as Arc<dyn EventRepository>,
            Arc::clone(&event_files) as Arc<dyn EventFileRepository>,
            Arc::clone(&history) as Arc<dyn HistoryRepository>,
        );

        Harness {
            pipeline,
            events,
            event_files,
            history,
            _downloads: downloads,
            library,
        }
    }

    fn event() -> Event {
        let mut event = Event::new("UFC 310: Pantoja vs Asakura".to_string(), Sport::Fighting);
        event.event_date = Some(Utc.with_ymd_and_hms(2024, 12, 7, 0, 0, 0).unwrap());
        event
    }

    fn seed_download(dir: &Path, name: &str, size: usize) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&vec![0u8; size]).unwrap();
        path
    }

    fn request(save_path: &Path) -> ImportRequest {
        ImportRequest {
            client_host: "localhost".to_string(),
            vendor_save_path: save_path.display().to_string(),
            quality: Some("WEBDL-1080p".to_string()),
            part_name: None,
            part_number: None,
        }
    }

    #[tokio::test]
    async fn happy_path_writes_file_records_and_has_file() {
        let h = harness(Some(10 * 1024 * 1024 * 1024));
        let download_dir = h._downloads.path().join("UFC.310.2024.1080p");
        seed_download(&download_dir, "ufc.310.mkv", 4096);
        seed_download(&download_dir, "sample.txt", 100);

        let event = event();
        let outcome = h
            .pipeline
            .import(&event, &request(&download_dir))
            .await
            .unwrap();

        assert!(outcome.destination.exists());
        assert!(outcome
            .destination
            .display()
            .to_string()
            .starts_with(&h.library.path().display().to_string()));
        assert_eq!(h.event_files.files.lock().unwrap().len(), 1);
        assert!(h.events.updated.lock().unwrap()[0].has_file);
        let history = h.history.records.lock().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].decision, "imported");
    }

    #[tokio::test]
    async fn second_import_gets_numbered_suffix_and_second_record() {
        let h = harness(Some(10 * 1024 * 1024 * 1024));
        let download_dir = h._downloads.path().join("UFC.310.2024.1080p");
        seed_download(&download_dir, "ufc.310.mkv", 4096);

        let event = event();
        let first = h.pipeline.import(&event, &request(&download_dir)).await.unwrap();
        let second = h.pipeline.import(&event, &request(&download_dir)).await.unwrap();

        assert_ne!(first.destination, second.destination);
        assert!(second
            .destination
            .display()
            .to_string()
            .contains("(1)"));
        assert!(first.destination.exists());
        assert!(second.destination.exists());
        assert_eq!(h.event_files.files.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn largest_video_file_wins() {
        let h = harness(Some(10 * 1024 * 1024 * 1024));
        let download_dir = h._downloads.path().join("pack");
        seed_download(&download_dir, "small.mkv", 100);
        seed_download(&download_dir, "big.mkv", 9000);
        seed_download(&download_dir, "huge-but-not-video.iso", 90_000);

        let event = event();
        let outcome = h.pipeline.import(&event, &request(&download_dir)).await.unwrap();
        assert_eq!(outcome.event_file.size_bytes, 9000);
    }

    #[tokio::test]
    async fn insufficient_space_fails_and_records_history() {
        let h = harness(Some(0));
        let download_dir = h._downloads.path().join("UFC.310");
        seed_download(&download_dir, "ufc.310.mkv", 4096);

        let event = event();
        let result = h.pipeline.import(&event, &request(&download_dir)).await;
        assert!(result.is_err());

        let history = h.history.records.lock().unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].decision.contains("root folder"));
        // The source download is left intact
        assert!(download_dir.join("ufc.310.mkv").exists());
    }

    #[tokio::test]
    async fn no_video_file_is_an_import_error() {
        let h = harness(Some(10 * 1024 * 1024 * 1024));
        let download_dir = h._downloads.path().join("empty");
        seed_download(&download_dir, "readme.txt", 10);

        let event = event();
        let result = h.pipeline.import(&event, &request(&download_dir)).await;
        assert!(result.is_err());
    }
}

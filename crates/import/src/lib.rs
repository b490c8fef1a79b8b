//! Arenarr import pipeline
//!
//! Turns a completed download into a library file: resolves the locally
//! accessible path, picks the video file, checks space, chooses a root
//! folder, builds the destination name, transfers (hardlink with copy
//! fallback) and records the `EventFile` and import history.

pub mod naming;
pub mod pipeline;
pub mod space;
pub mod transfer;

pub use naming::{DefaultNameBuilder, NameBuilder};
pub use pipeline::{ImportConfig, ImportOutcome, ImportPipeline, ImportRequest};
pub use space::{SpaceProbe, SystemSpaceProbe};
pub use transfer::{FileTransfer, TransferMode, TransferOutcome};

/// File extensions accepted as video payloads.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "ts", "m2ts", "mov", "wmv", "webm", "mpg", "mpeg",
];

/// Whether a path carries an allowed video extension.
pub fn is_video_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

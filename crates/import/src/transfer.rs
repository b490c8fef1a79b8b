//! File transfer with hardlink preference
//!
//! Hardlink when configured so seeding sources stay intact, fall back to
//! copy when the destination is on another filesystem (EXDEV), and move
//! only when explicitly asked to.

use arenarr_core::{ArenarrError, Result};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tracing::{debug, info, warn};

/// How a file ended up at its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Hardlink,
    Copy,
    Move,
}

/// Result of one transfer
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mode: TransferMode,
    pub file_size: u64,
}

/// Transfers files into the library
#[derive(Debug, Clone)]
pub struct FileTransfer {
    use_hardlinks: bool,
}

impl FileTransfer {
    pub fn new(use_hardlinks: bool) -> Self {
        Self { use_hardlinks }
    }

    /// Place `source` at `destination`, creating parent directories.
    /// `allow_move` permits consuming the source when neither hardlink nor
    /// copy is wanted.
    pub async fn transfer(
        &self,
        source: &Path,
        destination: &Path,
        allow_move: bool,
    ) -> Result<TransferOutcome> {
        if !source.exists() {
            return Err(ArenarrError::ImportError {
                operation: "transfer".to_string(),
                message: format!("source file does not exist: {}", source.display()),
            });
        }

        let metadata =
            async_fs::metadata(source)
                .await
                .map_err(|e| ArenarrError::FileSystemError {
                    path: source.display().to_string(),
                    error: e.to_string(),
                })?;
        let file_size = metadata.len();

        if let Some(parent) = destination.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| ArenarrError::FileSystemError {
                    path: parent.display().to_string(),
                    error: e.to_string(),
                })?;
        }

        if self.use_hardlinks {
            match self.try_hardlink(source, destination).await {
                Ok(()) => {
                    info!(destination = %destination.display(), "hardlinked");
                    return Ok(TransferOutcome {
                        source: source.to_path_buf(),
                        destination: destination.to_path_buf(),
                        mode: TransferMode::Hardlink,
                        file_size,
                    });
                }
                Err(error) => {
                    // EXDEV: destination lives on another filesystem
                    if error.raw_os_error() == Some(18) {
                        debug!("hardlink crossed devices, falling back to copy");
                    } else {
                        warn!(%error, "hardlink failed, falling back to copy");
                    }
                }
            }
        }

        if allow_move {
            match async_fs::rename(source, destination).await {
                Ok(()) => {
                    info!(destination = %destination.display(), "moved");
                    return Ok(TransferOutcome {
                        source: source.to_path_buf(),
                        destination: destination.to_path_buf(),
                        mode: TransferMode::Move,
                        file_size,
                    });
                }
                Err(error) => {
                    debug!(%error, "rename failed, falling back to copy");
                }
            }
        }

        async_fs::copy(source, destination)
            .await
            .map_err(|e| ArenarrError::FileSystemError {
                path: destination.display().to_string(),
                error: format!("copy failed: {e}"),
            })?;
        info!(destination = %destination.display(), "copied");

        // Moves that fell through to copy still consume the source
        if allow_move && !self.use_hardlinks {
            if let Err(error) = async_fs::remove_file(source).await {
                warn!(%error, "failed to remove source after move-by-copy");
            }
        }

        Ok(TransferOutcome {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            mode: if allow_move && !self.use_hardlinks {
                TransferMode::Move
            } else {
                TransferMode::Copy
            },
            file_size,
        })
    }

    async fn try_hardlink(&self, source: &Path, destination: &Path) -> std::io::Result<()> {
        let source = source.to_path_buf();
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || std::fs::hard_link(&source, &destination))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[tokio::test]
    async fn hardlink_preserves_source() {
        let dir = TempDir::new().unwrap();
        let source = write_file(&dir, "source.mkv", b"payload");
        let destination = dir.path().join("library/dest.mkv");

        let transfer = FileTransfer::new(true);
        let outcome = transfer.transfer(&source, &destination, false).await.unwrap();

        assert_eq!(outcome.mode, TransferMode::Hardlink);
        assert!(source.exists());
        assert!(destination.exists());
        assert_eq!(outcome.file_size, 7);
    }

    #[tokio::test]
    async fn copy_mode_when_hardlinks_disabled() {
        let dir = TempDir::new().unwrap();
        let source = write_file(&dir, "source.mkv", b"payload");
        let destination = dir.path().join("dest.mkv");

        let transfer = FileTransfer::new(false);
        let outcome = transfer.transfer(&source, &destination, false).await.unwrap();

        assert_eq!(outcome.mode, TransferMode::Copy);
        assert!(source.exists());
        assert!(destination.exists());
    }

    #[tokio::test]
    async fn missing_source_is_an_import_error() {
        let dir = TempDir::new().unwrap();
        let transfer = FileTransfer::new(true);
        let result = transfer
            .transfer(
                &dir.path().join("missing.mkv"),
                &dir.path().join("dest.mkv"),
                false,
            )
            .await;
        assert!(result.is_err());
    }
}

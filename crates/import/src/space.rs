//! Disk-space probing
//!
//! A small seam so the pipeline's free-space preflight can be faked in
//! tests. The real implementation asks sysinfo for the disk whose mount
//! point owns the path.

use std::path::Path;
use sysinfo::Disks;

/// Free-space and accessibility checks for candidate destinations.
pub trait SpaceProbe: Send + Sync {
    /// Available bytes on the filesystem holding `path`, if known.
    fn free_space_bytes(&self, path: &Path) -> Option<u64>;

    /// Whether the directory exists and can be listed.
    fn is_accessible(&self, path: &Path) -> bool {
        std::fs::read_dir(path).is_ok()
    }
}

/// `SpaceProbe` backed by the operating system's disk list.
#[derive(Debug, Default)]
pub struct SystemSpaceProbe;

impl SpaceProbe for SystemSpaceProbe {
    fn free_space_bytes(&self, path: &Path) -> Option<u64> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inaccessible_path_is_reported() {
        let probe = SystemSpaceProbe;
        assert!(!probe.is_accessible(Path::new("/definitely/not/a/real/path")));
    }
}

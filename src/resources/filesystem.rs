//! Filesystem capacity via `statvfs(3)`.

use crate::models::{FilesystemUsage, ResourceError};
use nix::sys::statvfs::statvfs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Reads capacity figures for the filesystem mounted at `path`.
///
/// Fails when the path cannot be stat'ed or is not itself a mount point, so a
/// missing mount never silently reports the parent filesystem.
pub fn read_filesystem_usage(path: &Path) -> Result<FilesystemUsage, ResourceError> {
    if !is_mount_point(path)? {
        return Err(ResourceError::NotMounted {
            path: path.display().to_string(),
        });
    }

    let stats = statvfs(path).map_err(|e| ResourceError::Statvfs {
        path: path.display().to_string(),
        source: e,
    })?;

    let fragment = stats.fragment_size() as u64;
    let size_bytes = fragment * stats.blocks() as u64;
    let free_bytes = fragment * stats.blocks_free() as u64;
    let avail_bytes = fragment * stats.blocks_available() as u64;

    Ok(FilesystemUsage {
        size_bytes,
        used_bytes: size_bytes.saturating_sub(free_bytes),
        avail_bytes,
        inodes: stats.files() as u64,
        inodes_free: stats.files_free() as u64,
    })
}

/// A path is a mount point when it is the root or sits on a different
/// device than its parent directory.
fn is_mount_point(path: &Path) -> Result<bool, ResourceError> {
    let read_err = |p: &Path, e: std::io::Error| ResourceError::Read {
        path: p.display().to_string(),
        source: e,
    };

    let canonical = path.canonicalize().map_err(|e| read_err(path, e))?;
    let Some(parent) = canonical.parent() else {
        return Ok(true);
    };

    let own = std::fs::metadata(&canonical).map_err(|e| read_err(&canonical, e))?;
    let above = std::fs::metadata(parent).map_err(|e| read_err(parent, e))?;
    Ok(own.dev() != above.dev() || own.ino() == above.ino())
}

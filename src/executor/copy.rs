//! Size-gated file copy

use super::pipeline::copy_chunked;
use crate::logging::Logger;
use crate::types::{EntryInfo, SyncError};
use filetime::FileTime;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Copy one file entry from `src` to `dst`
///
/// Files of at least `chunk_size` bytes go through the chunk pipeline on
/// `runtime`; smaller ones are read and written whole. Either way the
/// parent directory is created first and the destination ends up with the
/// entry's permission bits and modification time.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes copied
/// * `Err(SyncError)` - Copy failure for `src` or `dst`
pub fn copy_entry(
    src: &Path,
    dst: &Path,
    entry: &EntryInfo,
    chunk_size: usize,
    runtime: &Runtime,
    logger: Arc<dyn Logger>,
) -> Result<u64, SyncError> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|source| SyncError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    clear_destination(dst)?;

    let bytes = if entry.size >= chunk_size as u64 {
        logger.debug(&format!(
            "Chunked copy of {} ({} bytes, {} byte chunks)",
            entry.relative_path, entry.size, chunk_size
        ));
        runtime.block_on(copy_chunked(
            src,
            dst,
            chunk_size,
            entry.permissions,
            Arc::clone(&logger),
        ))?
    } else {
        copy_whole(src, dst)?
    };

    apply_metadata(dst, entry)?;
    Ok(bytes)
}

/// Whole-file copy for small files
pub fn copy_whole(src: &Path, dst: &Path) -> Result<u64, SyncError> {
    let data = fs::read(src).map_err(|source| SyncError::Copy {
        path: src.to_path_buf(),
        source,
    })?;

    fs::write(dst, &data).map_err(|source| SyncError::Copy {
        path: dst.to_path_buf(),
        source,
    })?;

    Ok(data.len() as u64)
}

/// Set permission bits and modification time from `entry`
pub fn apply_metadata(dst: &Path, entry: &EntryInfo) -> Result<(), SyncError> {
    let copy_err = |source| SyncError::Copy {
        path: dst.to_path_buf(),
        source,
    };

    set_mode(dst, entry.permissions).map_err(copy_err)?;
    filetime::set_file_mtime(dst, FileTime::from_system_time(entry.modified()))
        .map_err(copy_err)?;
    Ok(())
}

/// Remove what would stop `dst` from being opened for writing
///
/// A directory in the way goes, and so does an earlier copy whose mode
/// lacks owner write.
fn clear_destination(dst: &Path) -> Result<(), SyncError> {
    let metadata = match fs::symlink_metadata(dst) {
        Ok(metadata) => metadata,
        Err(_) => return Ok(()),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(dst)
    } else if lacks_owner_write(&metadata) {
        fs::remove_file(dst)
    } else {
        return Ok(());
    };

    result.map_err(|source| SyncError::Delete {
        path: dst.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn lacks_owner_write(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o200 == 0
}

#[cfg(not(unix))]
fn lacks_owner_write(metadata: &fs::Metadata) -> bool {
    metadata.permissions().readonly()
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, permissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    fn entry_for(path: &str, size: u64) -> EntryInfo {
        EntryInfo::file(path, size, UNIX_EPOCH + Duration::from_secs(1_600_000_000), 0o640)
    }

    #[test]
    fn test_copy_creates_parents_and_preserves_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.txt");
        let dst = temp_dir.path().join("out/nested/dst.txt");
        fs::write(&src, b"Hello, World!").unwrap();
        let entry = entry_for("dst.txt", 13);

        let bytes = copy_entry(&src, &dst, &entry, 1024, &runtime(), logging::noop()).unwrap();

        assert_eq!(bytes, 13);
        assert_eq!(fs::read(&dst).unwrap(), b"Hello, World!");
        let mtime = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(mtime.unix_seconds(), 1_600_000_000);
    }

    #[test]
    fn test_copy_at_threshold_uses_pipeline() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.bin");
        let dst = temp_dir.path().join("dst.bin");
        let content: Vec<u8> = (0..64u8).collect();
        fs::write(&src, &content).unwrap();

        let bytes = copy_entry(
            &src,
            &dst,
            &entry_for("dst.bin", 64),
            64,
            &runtime(),
            logging::noop(),
        )
        .unwrap();

        assert_eq!(bytes, 64);
        assert_eq!(fs::read(&dst).unwrap(), content);
    }

    #[test]
    fn test_copy_replaces_directory_with_file() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.txt");
        let dst = temp_dir.path().join("dst");
        fs::write(&src, b"now a file").unwrap();
        fs::create_dir_all(dst.join("inner")).unwrap();

        copy_entry(&src, &dst, &entry_for("dst", 10), 1024, &runtime(), logging::noop())
            .unwrap();

        assert!(dst.is_file());
    }

    #[test]
    #[cfg(unix)]
    fn test_copy_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.txt");
        let dst = temp_dir.path().join("dst.txt");
        fs::write(&src, b"x").unwrap();

        copy_entry(&src, &dst, &entry_for("dst.txt", 1), 1024, &runtime(), logging::noop())
            .unwrap();

        let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    #[cfg(unix)]
    fn test_read_only_copy_can_be_replaced() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("ro.txt");
        let dst = temp_dir.path().join("out/ro.txt");
        let mut entry = entry_for("ro.txt", 5);
        entry.permissions = 0o444;

        fs::write(&src, b"first").unwrap();
        copy_entry(&src, &dst, &entry, 1024, &runtime(), logging::noop()).unwrap();
        assert_eq!(fs::metadata(&dst).unwrap().permissions().mode() & 0o777, 0o444);

        // Small path, then the chunk pipeline.
        fs::write(&src, b"second").unwrap();
        entry.size = 6;
        copy_entry(&src, &dst, &entry, 1024, &runtime(), logging::noop()).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"second");

        fs::write(&src, b"third!!").unwrap();
        entry.size = 7;
        copy_entry(&src, &dst, &entry, 4, &runtime(), logging::noop()).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"third!!");
        assert_eq!(fs::metadata(&dst).unwrap().permissions().mode() & 0o777, 0o444);
    }

    #[test]
    fn test_copy_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("missing.txt");
        let dst = temp_dir.path().join("dst.txt");

        let err = copy_whole(&src, &dst).unwrap_err();
        assert!(matches!(err, SyncError::Copy { .. }));
        assert!(!dst.exists());
    }
}

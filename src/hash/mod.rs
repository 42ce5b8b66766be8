//! Content fingerprints

use crate::types::SyncError;
use std::fs::{self, File, Metadata};
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;
use xxhash_rust::xxh64::Xxh64;

const BUFFER_SIZE: usize = 64 * 1024;

/// Compute the xxh64 fingerprint of a file as 16 lowercase hex digits
///
/// The file is streamed in 64KB chunks. It is stat'ed before and after
/// hashing; if either the modification time or the length moved, the
/// digest describes no consistent version of the file and
/// [`SyncError::ChecksumInvalidated`] is returned instead.
///
/// xxh64 is not collision resistant. Two equal fingerprints are treated as
/// equal content.
///
/// # Example
/// ```no_run
/// use replik::hash::compute_fingerprint;
/// use std::path::Path;
///
/// let fingerprint = compute_fingerprint(Path::new("file.txt"))?;
/// assert_eq!(fingerprint.len(), 16);
/// # Ok::<(), replik::types::SyncError>(())
/// ```
pub fn compute_fingerprint(file_path: &Path) -> Result<String, SyncError> {
    let checksum_err = |source| SyncError::Checksum {
        path: file_path.to_path_buf(),
        source,
    };

    let before = fs::metadata(file_path).map_err(checksum_err)?;
    let file = File::open(file_path).map_err(checksum_err)?;

    fingerprint_stream(file_path, &before, file)
}

/// Hash `reader` as the content of `file_path`, then re-stat the path
/// against `before`
fn fingerprint_stream<R: Read>(
    file_path: &Path,
    before: &Metadata,
    mut reader: R,
) -> Result<String, SyncError> {
    let checksum_err = |source| SyncError::Checksum {
        path: file_path.to_path_buf(),
        source,
    };

    let mut hasher = Xxh64::new(0);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(checksum_err)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let after = fs::metadata(file_path).map_err(checksum_err)?;
    if changed(before, &after) {
        return Err(SyncError::ChecksumInvalidated {
            path: file_path.to_path_buf(),
        });
    }

    Ok(format!("{:016x}", hasher.digest()))
}

/// Fingerprint of an in-memory buffer, same format as [`compute_fingerprint`]
pub fn fingerprint_bytes(data: &[u8]) -> String {
    format!("{:016x}", xxhash_rust::xxh64::xxh64(data, 0))
}

fn changed(before: &Metadata, after: &Metadata) -> bool {
    before.len() != after.len() || modified(before) != modified(after)
}

fn modified(metadata: &Metadata) -> Option<SystemTime> {
    metadata.modified().ok()
}

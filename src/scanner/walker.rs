//! Directory walker that builds a Snapshot

use super::exclude::ExcludeRules;
use crate::hash::compute_fingerprint;
use crate::logging::{self, Logger};
use crate::retry::RetryPolicy;
use crate::types::{EntryInfo, Snapshot, SyncError};
use ignore::{DirEntry, WalkBuilder};
use std::fs::{self, Metadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Callback for reporting scan progress
///
/// Arguments:
/// - `entries_scanned`: Number of entries added to the snapshot so far
/// - `bytes_scanned`: Total file bytes seen so far
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Content fingerprint function used for regular files
pub type FingerprintFn = fn(&Path) -> Result<String, SyncError>;

/// Walks a source tree and records every reachable, non-excluded entry
pub struct Scanner {
    excludes: ExcludeRules,
    retry: RetryPolicy,
    logger: Arc<dyn Logger>,
    on_progress: Option<ProgressCallback>,
    fingerprint: FingerprintFn,
}

impl Scanner {
    /// Scanner applying `patterns` plus the built-in exclusions
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            excludes: ExcludeRules::with_defaults(patterns),
            retry: RetryPolicy::default(),
            logger: logging::noop(),
            on_progress: None,
            fingerprint: compute_fingerprint,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Replace [`compute_fingerprint`]
    pub fn with_fingerprint(mut self, fingerprint: FingerprintFn) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Scan `root` into a Snapshot keyed by `/`-separated relative path
    ///
    /// # Errors
    /// * `Config` if `root` is empty
    /// * `SourceMissing` if `root` cannot be stat'ed after retries
    /// * `NotADirectory` if `root` is not a directory
    /// * `RelativePath` or `Walk` if the traversal itself breaks down
    ///
    /// Entries that vanish mid-scan, files whose fingerprint fails, and
    /// unreadable subdirectories are logged and left out of the snapshot.
    pub fn scan(&self, root: &Path) -> Result<Snapshot, SyncError> {
        if root.as_os_str().is_empty() {
            return Err(SyncError::Config("Source path is empty".to_string()));
        }

        let root_meta = self
            .retry
            .run("stat", root, self.logger.as_ref(), || fs::metadata(root))
            .map_err(|source| SyncError::SourceMissing {
                path: root.to_path_buf(),
                source,
            })?;

        if !root_meta.is_dir() {
            return Err(SyncError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let start_time = Instant::now();
        let mut snapshot = Snapshot::new();
        let mut scanned_count: u64 = 0;
        let mut scanned_bytes: u64 = 0;

        let walker = self.build_walker(root);

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    match err.io_error().map(|e| e.kind()) {
                        Some(ErrorKind::PermissionDenied) => {
                            self.logger
                                .warn(&format!("Skipping unreadable directory: {}", err));
                        }
                        Some(ErrorKind::NotFound) => {
                            self.logger
                                .debug(&format!("Directory vanished during scan: {}", err));
                        }
                        _ => {
                            self.logger.error(&format!("Directory walk failed: {}", err));
                            return Err(SyncError::Walk(err));
                        }
                    }
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }

            let relative_path = relative_key(root, entry.path()).ok_or_else(|| {
                SyncError::RelativePath {
                    path: entry.path().to_path_buf(),
                }
            })?;

            if let Some(info) = self.inspect(&entry, relative_path) {
                scanned_count += 1;
                scanned_bytes += info.size;
                snapshot.insert(info);

                if let Some(callback) = &self.on_progress {
                    callback(scanned_count, scanned_bytes);
                }
            }
        }

        self.logger.info(&format!(
            "Scanned {} entries ({} bytes) in {:.2?}",
            snapshot.len(),
            snapshot.total_size(),
            start_time.elapsed()
        ));

        Ok(snapshot)
    }

    fn build_walker(&self, root: &Path) -> ignore::Walk {
        let excludes = self.excludes.clone();
        let logger = Arc::clone(&self.logger);
        let filter_root = root.to_path_buf();

        WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry: &DirEntry| {
                match relative_key(&filter_root, entry.path()) {
                    Some(key) if !key.is_empty() && excludes.is_excluded(&key) => {
                        logger.debug(&format!("Excluded {}", key));
                        false
                    }
                    _ => true,
                }
            })
            .build()
    }

    /// Turn one walked entry into an EntryInfo, or `None` to leave it out
    fn inspect(&self, entry: &DirEntry, relative_path: String) -> Option<EntryInfo> {
        let path = entry.path();

        let metadata = match self.retry.run("stat", path, self.logger.as_ref(), || {
            fs::symlink_metadata(path)
        }) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.logger
                    .debug(&format!("Entry vanished during scan: {}", relative_path));
                return None;
            }
            Err(e) => {
                self.logger.warn(&format!(
                    "Failed to read metadata for {}: {}. Entry will be skipped.",
                    relative_path, e
                ));
                return None;
            }
        };

        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            self.logger
                .debug(&format!("Skipping symlink: {}", relative_path));
            return None;
        }
        if !file_type.is_dir() && !file_type.is_file() {
            self.logger
                .debug(&format!("Skipping special file: {}", relative_path));
            return None;
        }

        let mtime = match metadata.modified() {
            Ok(mtime) => mtime,
            Err(e) => {
                self.logger.warn(&format!(
                    "Failed to get modification time for {}: {}. Entry will be skipped.",
                    relative_path, e
                ));
                return None;
            }
        };

        let permissions = permission_bits(&metadata);

        if file_type.is_dir() {
            return Some(EntryInfo::directory(relative_path, mtime, permissions));
        }

        let fingerprint = self
            .retry
            .run("checksum", path, self.logger.as_ref(), || {
                (self.fingerprint)(path)
            });

        match fingerprint {
            Ok(fingerprint) => Some(
                EntryInfo::file(relative_path, metadata.len(), mtime, permissions)
                    .with_checksum(fingerprint),
            ),
            Err(e) if e.is_not_found() => {
                self.logger
                    .debug(&format!("File vanished during checksum: {}", relative_path));
                None
            }
            Err(e) => {
                self.logger.warn(&format!("Skipping {}: {}", relative_path, e));
                None
            }
        }
    }
}

/// Scan with the given exclude patterns and no logging
pub fn scan_directory<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Snapshot, SyncError> {
    Scanner::new(patterns).scan(root)
}

/// `/`-joined path of `path` below `root`, `None` if it is not below it
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative: PathBuf = path.strip_prefix(root).ok()?.to_path_buf();
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

//! Executor module for applying sync actions to the destination

pub mod copy;
pub mod pipeline;

use crate::logging::{self, Logger};
use crate::types::{ActionKind, EntryInfo, SyncAction, SyncError};
use filetime::FileTime;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

pub use copy::{apply_metadata, copy_entry, copy_whole};
pub use pipeline::copy_chunked;

/// Files at or above this size use the chunk pipeline by default (32 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Execution progress statistics for a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Number of actions in the input list.
    pub total_actions: usize,
    /// Number of successfully processed actions (skips included).
    pub completed_actions: usize,
    /// Number of failed actions (0 or 1; the first failure stops the run).
    pub failed_actions: usize,
    /// Aggregate copied bytes (Create + Update of files).
    pub bytes_copied: u64,
}

/// Events emitted while executing actions.
#[derive(Debug)]
pub enum ExecutionEvent<'a> {
    /// Action execution started.
    ActionStart {
        index: usize,
        total: usize,
        kind: ActionKind,
        path: &'a str,
    },
    /// Action execution succeeded.
    ActionSuccess {
        index: usize,
        total: usize,
        kind: ActionKind,
        path: &'a str,
        bytes_copied: u64,
    },
    /// Action execution failed; no further actions run.
    ActionError {
        index: usize,
        total: usize,
        kind: ActionKind,
        path: &'a str,
        error: &'a SyncError,
    },
    /// Execution finished (with or without error).
    Complete { stats: &'a ExecutionStats },
}

/// Optional callback used to receive execution events.
pub type ExecutionCallback<'a> = dyn Fn(&ExecutionEvent<'_>) + Send + Sync + 'a;

/// Applies a list of [`SyncAction`]s to a destination tree
pub struct Executor {
    chunk_size: usize,
    logger: Arc<dyn Logger>,
    runtime: Runtime,
}

impl Executor {
    /// Executor whose chunk pipeline kicks in at `chunk_size` bytes
    pub fn new(chunk_size: usize) -> Result<Self, SyncError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("replik-copy")
            .enable_all()
            .build()
            .map_err(|e| SyncError::Pipeline(format!("failed to start copy runtime: {}", e)))?;

        Ok(Self {
            chunk_size: chunk_size.max(1),
            logger: logging::noop(),
            runtime,
        })
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Apply `actions` in order, stopping at the first failure
    ///
    /// Already-applied actions are not rolled back. After the last action,
    /// directories that were created or updated get their source
    /// modification time back, deepest first, because writing their
    /// children moved it.
    pub fn execute(
        &self,
        src_root: &Path,
        dst_root: &Path,
        actions: &[SyncAction],
        on_event: Option<&ExecutionCallback<'_>>,
    ) -> Result<ExecutionStats, SyncError> {
        let mut stats = ExecutionStats {
            total_actions: actions.len(),
            ..Default::default()
        };
        let mut touched_dirs: Vec<&EntryInfo> = Vec::new();

        for (idx, action) in actions.iter().enumerate() {
            let index = idx + 1;
            let kind = action.kind();
            let path = action.path();

            emit_event(
                on_event,
                &ExecutionEvent::ActionStart {
                    index,
                    total: stats.total_actions,
                    kind,
                    path,
                },
            );

            match self.execute_action(action, src_root, dst_root) {
                Ok(bytes) => {
                    stats.completed_actions += 1;
                    stats.bytes_copied += bytes;

                    if let Some(entry) = action.source().filter(|e| e.is_dir) {
                        touched_dirs.push(entry);
                    }

                    emit_event(
                        on_event,
                        &ExecutionEvent::ActionSuccess {
                            index,
                            total: stats.total_actions,
                            kind,
                            path,
                            bytes_copied: bytes,
                        },
                    );
                }
                Err(err) => {
                    stats.failed_actions += 1;
                    self.logger
                        .error(&format!("{} {} failed: {}", kind, path, err));

                    emit_event(
                        on_event,
                        &ExecutionEvent::ActionError {
                            index,
                            total: stats.total_actions,
                            kind,
                            path,
                            error: &err,
                        },
                    );
                    emit_event(on_event, &ExecutionEvent::Complete { stats: &stats });
                    return Err(err);
                }
            }
        }

        self.restore_directory_times(dst_root, &mut touched_dirs);

        self.logger.info(&format!(
            "Applied {} actions, {} bytes copied",
            stats.completed_actions, stats.bytes_copied
        ));
        emit_event(on_event, &ExecutionEvent::Complete { stats: &stats });

        Ok(stats)
    }

    fn execute_action(
        &self,
        action: &SyncAction,
        src_root: &Path,
        dst_root: &Path,
    ) -> Result<u64, SyncError> {
        match action {
            SyncAction::Skip(_) => Ok(0),
            SyncAction::Create(entry) | SyncAction::Update(entry) => {
                let src_path = src_root.join(&entry.relative_path);
                let dst_path = dst_root.join(&entry.relative_path);

                if entry.is_dir {
                    self.logger
                        .debug(&format!("Creating directory {}", entry.relative_path));
                    ensure_directory(&dst_path).map(|_| 0)
                } else {
                    self.logger
                        .debug(&format!("Copying {} ({} bytes)", entry.relative_path, entry.size));
                    copy_entry(
                        &src_path,
                        &dst_path,
                        entry,
                        self.chunk_size,
                        &self.runtime,
                        Arc::clone(&self.logger),
                    )
                }
            }
            SyncAction::Delete(path) => {
                self.logger.debug(&format!("Deleting {}", path));
                remove_path_any(&dst_root.join(path)).map(|_| 0)
            }
        }
    }

    fn restore_directory_times(&self, dst_root: &Path, dirs: &mut [&EntryInfo]) {
        dirs.sort_by_key(|entry| std::cmp::Reverse(entry.relative_path.matches('/').count()));

        for entry in dirs.iter() {
            let path = dst_root.join(&entry.relative_path);
            let mtime = FileTime::from_system_time(entry.modified());
            if let Err(e) = filetime::set_file_mtime(&path, mtime) {
                self.logger.warn(&format!(
                    "Failed to set modification time on {}: {}",
                    path.display(),
                    e
                ));
            }
        }
    }
}

/// Execute with a fresh [`Executor`] and no logging
pub fn execute_actions(
    src_root: &Path,
    dst_root: &Path,
    actions: &[SyncAction],
    chunk_size: usize,
) -> Result<ExecutionStats, SyncError> {
    Executor::new(chunk_size)?.execute(src_root, dst_root, actions, None)
}

/// Create `path` and any missing parents, replacing a file in the way
fn ensure_directory(path: &Path) -> Result<(), SyncError> {
    if let Ok(metadata) = fs::symlink_metadata(path) {
        if !metadata.is_dir() {
            remove_path_any(path)?;
        }
    }

    fs::create_dir_all(path).map_err(|source| SyncError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove any filesystem entry at `path`.
///
/// Directories are removed recursively; files and symlinks are removed as
/// files. A path that is already gone counts as removed, including one
/// whose ancestor has since been replaced by a file.
fn remove_path_any(path: &Path) -> Result<(), SyncError> {
    let delete_err = |source| SyncError::Delete {
        path: path.to_path_buf(),
        source,
    };

    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if already_gone(&e) => return Ok(()),
        Err(e) => return Err(delete_err(e)),
    };

    let result = if metadata.file_type().is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if already_gone(&e) => Ok(()),
        Err(e) => Err(delete_err(e)),
    }
}

fn already_gone(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

fn emit_event(on_event: Option<&ExecutionCallback<'_>>, event: &ExecutionEvent<'_>) {
    if let Some(callback) = on_event {
        callback(event);
    }
}

//! Persisted sync state
//!
//! The state lives in the destination root as `.sync_state` (JSON). Saves go
//! through `.sync_state.tmp`: write the full document, sync it to disk, then
//! rename it over the canonical file. A reader therefore sees either the
//! previous complete state or the new one.

use crate::logging::{self, Logger};
use crate::types::{SyncError, SyncState, STATE_VERSION};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the state file inside the destination root
pub const STATE_FILE_NAME: &str = ".sync_state";

/// Sibling used while a save is in flight
pub const STATE_TEMP_FILE_NAME: &str = ".sync_state.tmp";

/// Canonical state file path for a destination
pub fn state_path(destination: &Path) -> PathBuf {
    destination.join(STATE_FILE_NAME)
}

fn require_destination(destination: &Path) -> Result<(), SyncError> {
    if destination.as_os_str().is_empty() {
        return Err(SyncError::Config("Destination path is empty".to_string()));
    }
    Ok(())
}

/// Loads and atomically saves [`SyncState`]
#[derive(Clone)]
pub struct StateStore {
    logger: Arc<dyn Logger>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            logger: logging::noop(),
        }
    }

    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    /// Load the state of `destination`, initializing it on first use
    ///
    /// A missing state file yields a fresh empty state that is persisted
    /// before it is returned. Malformed content or an unknown schema version
    /// is an error; nothing is recovered from a damaged file.
    pub fn load(&self, destination: &Path) -> Result<SyncState, SyncError> {
        match self.read(destination)? {
            Some(state) => Ok(state),
            None => {
                self.logger.info(&format!(
                    "No sync state in {}, starting fresh",
                    destination.display()
                ));
                let mut state = SyncState::new();
                self.save(destination, &mut state)?;
                Ok(state)
            }
        }
    }

    /// Like [`load`](Self::load) but never writes; a missing file reads as empty
    pub fn peek(&self, destination: &Path) -> Result<SyncState, SyncError> {
        Ok(self.read(destination)?.unwrap_or_default())
    }

    /// Stamp `state` with the current time and persist it atomically
    ///
    /// If the final rename fails the temporary file is removed and the
    /// previous state file is left as it was.
    pub fn save(&self, destination: &Path, state: &mut SyncState) -> Result<(), SyncError> {
        require_destination(destination)?;

        state.touch();
        let content = serde_json::to_vec_pretty(state).map_err(SyncError::StateSerialize)?;

        fs::create_dir_all(destination).map_err(|source| SyncError::CreateDir {
            path: destination.to_path_buf(),
            source,
        })?;

        let temp_path = destination.join(STATE_TEMP_FILE_NAME);
        let final_path = state_path(destination);

        if let Err(source) = write_synced(&temp_path, &content) {
            let _ = fs::remove_file(&temp_path);
            return Err(SyncError::StateWrite {
                path: temp_path,
                source,
            });
        }

        if let Err(source) = fs::rename(&temp_path, &final_path) {
            let _ = fs::remove_file(&temp_path);
            self.logger.error(&format!(
                "Failed to move {} into place: {}",
                final_path.display(),
                source
            ));
            return Err(SyncError::StateReplace {
                path: final_path,
                source,
            });
        }

        self.logger.debug(&format!(
            "Saved sync state with {} entries to {}",
            state.entries.len(),
            final_path.display()
        ));
        Ok(())
    }

    fn read(&self, destination: &Path) -> Result<Option<SyncState>, SyncError> {
        require_destination(destination)?;
        let path = state_path(destination);

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SyncError::StateRead { path, source }),
        };

        let state: SyncState = serde_json::from_slice(&content)
            .map_err(|source| SyncError::StateParse {
                path: path.clone(),
                source,
            })?;

        if state.version != STATE_VERSION {
            return Err(SyncError::UnsupportedStateVersion {
                found: state.version,
                expected: STATE_VERSION,
            });
        }

        self.logger.debug(&format!(
            "Loaded sync state with {} entries from {}",
            state.entries.len(),
            path.display()
        ));
        Ok(Some(state))
    }
}

fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

//! Error types for replik

use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for replik operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source root could not be probed
    #[error("Source does not exist: {path}: {source}")]
    SourceMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source root exists but is not a directory
    #[error("Source is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Walked path is not under the scan root
    #[error("Relative path cannot be computed for {path}")]
    RelativePath { path: PathBuf },

    /// Directory traversal failed for a reason other than permissions
    #[error("Directory walk failed: {0}")]
    Walk(#[source] ignore::Error),

    /// File could not be read while hashing
    #[error("Checksum failed for {path}: {source}")]
    Checksum {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File changed while it was being hashed
    #[error("File modified during checksum: {path}")]
    ChecksumInvalidated { path: PathBuf },

    /// State file could not be read
    #[error("Failed to read state file {path}: {source}")]
    StateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file content is malformed
    #[error("Failed to parse state file {path}: {source}")]
    StateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// State file declares a schema this build does not understand
    #[error("Unsupported state version {found} (expected {expected})")]
    UnsupportedStateVersion { found: u32, expected: u32 },

    /// State could not be serialized
    #[error("Failed to serialize state: {0}")]
    StateSerialize(#[source] serde_json::Error),

    /// Temporary state file could not be written
    #[error("Failed to write state file {path}: {source}")]
    StateWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Temporary state file could not be moved into place
    #[error("Failed to replace state file {path}: {source}")]
    StateReplace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File copy failed
    #[error("Copy failed for {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source read failed partway through a chunked copy
    #[error("Read failed for {path} at offset {offset} bytes: {source}")]
    ChunkRead {
        path: PathBuf,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation failed
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Removal failed
    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copy pipeline task panicked or was cancelled
    #[error("Copy pipeline failed: {0}")]
    Pipeline(String),
}

impl SyncError {
    /// Underlying IO error, if this error wraps one
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            SyncError::Io(e)
            | SyncError::SourceMissing { source: e, .. }
            | SyncError::Checksum { source: e, .. }
            | SyncError::StateRead { source: e, .. }
            | SyncError::StateWrite { source: e, .. }
            | SyncError::StateReplace { source: e, .. }
            | SyncError::Copy { source: e, .. }
            | SyncError::ChunkRead { source: e, .. }
            | SyncError::CreateDir { source: e, .. }
            | SyncError::Delete { source: e, .. } => Some(e),
            SyncError::Walk(e) => e.io_error(),
            _ => None,
        }
    }

    /// Check if the target of the operation no longer exists
    pub fn is_not_found(&self) -> bool {
        self.io_error()
            .is_some_and(|e| e.kind() == ErrorKind::NotFound)
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, SyncError::Config(_))
    }

    /// Check if this error only affects a single entry of a scan
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::ChecksumInvalidated { .. } | SyncError::Checksum { .. }
        ) || self.is_not_found()
    }

    /// Check if this error is related to permissions
    pub fn is_permission_error(&self) -> bool {
        self.io_error()
            .is_some_and(|e| e.kind() == ErrorKind::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_automatic_conversion() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let error: SyncError = io_error.into();

        assert!(matches!(error, SyncError::Io(_)));
        assert!(error.to_string().contains("IO error"));
        assert!(error.is_not_found());
    }

    #[test]
    fn test_io_error_from_function() {
        fn returns_io_error() -> Result<(), SyncError> {
            let _file = std::fs::File::open("/nonexistent/path/file.txt")?;
            Ok(())
        }

        let result = returns_io_error();
        assert!(matches!(result, Err(SyncError::Io(_))));
    }

    #[test]
    fn test_config_error() {
        let error = SyncError::Config("Source path is empty".to_string());
        assert!(error.to_string().contains("Configuration error"));
        assert!(error.is_config_error());
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_checksum_invalidated_is_recoverable() {
        let error = SyncError::ChecksumInvalidated {
            path: PathBuf::from("busy.log"),
        };
        assert!(error.to_string().contains("busy.log"));
        assert!(error.is_recoverable());
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_not_found_through_wrapped_variants() {
        let error = SyncError::Checksum {
            path: PathBuf::from("gone.txt"),
            source: IoError::new(ErrorKind::NotFound, "gone"),
        };
        assert!(error.is_not_found());

        let error = SyncError::Copy {
            path: PathBuf::from("locked.txt"),
            source: IoError::new(ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!error.is_not_found());
        assert!(error.is_permission_error());
    }

    #[test]
    fn test_chunk_read_reports_offset() {
        let error = SyncError::ChunkRead {
            path: PathBuf::from("large_file.bin"),
            offset: 1048576,
            source: IoError::new(ErrorKind::UnexpectedEof, "short read"),
        };
        assert!(error.to_string().contains("large_file.bin"));
        assert!(error.to_string().contains("1048576"));
    }

    #[test]
    fn test_unsupported_version_message() {
        let error = SyncError::UnsupportedStateVersion {
            found: 7,
            expected: 1,
        };
        assert!(error.to_string().contains("7"));
        assert!(error.io_error().is_none());
    }

    #[test]
    fn test_result_propagation() {
        fn inner_function() -> Result<(), SyncError> {
            Err(SyncError::Config("test error".to_string()))
        }

        fn outer_function() -> Result<(), SyncError> {
            inner_function()?;
            Ok(())
        }

        assert!(matches!(outer_function(), Err(SyncError::Config(_))));
    }
}

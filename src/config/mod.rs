//! Configuration management

use crate::executor::DEFAULT_CHUNK_SIZE;
use crate::types::SyncError;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One-way directory synchronizer
#[derive(Parser, Debug, Clone)]
#[command(name = "replik", version, about, long_about = None)]
pub struct Cli {
    /// Source directory
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Destination directory
    #[arg(value_name = "DESTINATION")]
    pub destination: PathBuf,

    /// Verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Show what would change without touching the destination
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Treat files with equal size and fingerprint as unchanged
    #[arg(short, long)]
    pub checksum: bool,

    /// Files of at least this many bytes are copied in chunks of this size
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Exclude pattern (repeatable); a trailing `/` excludes a directory
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Bandwidth limit in KB/s (accepted, not enforced)
    #[arg(long, value_name = "KBPS")]
    pub bandwidth_limit: Option<u64>,

    /// TOML file providing defaults for the options above
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Option defaults read from a TOML file
///
/// ```toml
/// verbose = true
/// checksum = false
/// chunk_size = 1048576
/// exclude = ["*.log", "node_modules/"]
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub verbose: Option<bool>,
    pub dry_run: Option<bool>,
    pub checksum: Option<bool>,
    pub chunk_size: Option<usize>,
    pub exclude: Vec<String>,
    pub bandwidth_limit: Option<u64>,
}

impl FileConfig {
    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| SyncError::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Global configuration for replik
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Source directory
    pub source: PathBuf,

    /// Destination directory
    pub destination: PathBuf,

    /// Debug-level logging
    pub verbose: bool,

    /// Dry run (report the plan, don't execute)
    pub dry_run: bool,

    /// Compare by fingerprint instead of modification time
    pub checksum_mode: bool,

    /// Chunked-copy threshold and chunk size in bytes
    pub chunk_size: usize,

    /// Exclude patterns
    pub exclude_patterns: Vec<String>,

    /// Bandwidth limit (KB/s, None = unlimited); not enforced
    pub bandwidth_limit: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            verbose: false,
            dry_run: false,
            checksum_mode: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            exclude_patterns: Vec::new(),
            bandwidth_limit: None,
        }
    }
}

impl Config {
    /// Merge command-line flags over file defaults; flags win
    pub fn from_parts(cli: Cli, file: FileConfig) -> Self {
        let mut exclude_patterns = file.exclude;
        exclude_patterns.extend(cli.exclude);

        Self {
            source: cli.source,
            destination: cli.destination,
            verbose: cli.verbose || file.verbose.unwrap_or(false),
            dry_run: cli.dry_run || file.dry_run.unwrap_or(false),
            checksum_mode: cli.checksum || file.checksum.unwrap_or(false),
            chunk_size: cli
                .chunk_size
                .or(file.chunk_size)
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            exclude_patterns,
            bandwidth_limit: cli.bandwidth_limit.or(file.bandwidth_limit),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.source.as_os_str().is_empty() {
            return Err(SyncError::Config("Source path is empty".to_string()));
        }

        if self.destination.as_os_str().is_empty() {
            return Err(SyncError::Config("Destination path is empty".to_string()));
        }

        if self.source == self.destination {
            return Err(SyncError::Config(
                "Source and destination cannot be the same".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(SyncError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }

        if let Ok(metadata) = fs::metadata(&self.destination) {
            if metadata.permissions().readonly() {
                return Err(SyncError::Config(format!(
                    "Destination is not writable: {}",
                    self.destination.display()
                )));
            }
        }

        Ok(())
    }
}

impl TryFrom<Cli> for Config {
    type Error = SyncError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let config = Config::from_parts(cli, file);
        config.validate()?;
        Ok(config)
    }
}

//! Directory scanning logic

mod exclude;
mod walker;

pub use exclude::{should_exclude, ExcludeRules, DEFAULT_EXCLUDES};
pub use walker::{scan_directory, FingerprintFn, ProgressCallback, Scanner};

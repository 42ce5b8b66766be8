//! Exclusion rules applied while scanning

use globset::{Glob, GlobMatcher};

/// Names that are never synced: Finder litter and replik's own bookkeeping
pub const DEFAULT_EXCLUDES: &[&str] = &[".DS_Store", ".sync_state", ".sync_state.tmp"];

#[derive(Debug, Clone)]
enum Rule {
    /// `dir/`: the directory itself and everything beneath it
    Directory(String),
    /// Glob against the base name, or exact match on the whole path
    Name {
        pattern: String,
        glob: Option<GlobMatcher>,
    },
}

impl Rule {
    fn parse(pattern: &str) -> Option<Self> {
        if let Some(dir) = pattern.strip_suffix('/') {
            let dir = dir.trim_end_matches('/');
            if dir.is_empty() {
                return None;
            }
            return Some(Rule::Directory(dir.to_string()));
        }

        if pattern.is_empty() {
            return None;
        }

        Some(Rule::Name {
            pattern: pattern.to_string(),
            glob: Glob::new(pattern).ok().map(|g| g.compile_matcher()),
        })
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Rule::Directory(dir) => {
                path == dir
                    || path
                        .strip_prefix(dir.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Rule::Name { pattern, glob } => {
                if path == pattern {
                    return true;
                }
                glob.as_ref()
                    .is_some_and(|g| g.is_match(base_name(path)))
            }
        }
    }
}

/// Compiled set of exclusion patterns
#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    rules: Vec<Rule>,
}

impl ExcludeRules {
    /// Compile user patterns; malformed globs still match by exact path
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            rules: patterns
                .iter()
                .filter_map(|p| Rule::parse(p.as_ref()))
                .collect(),
        }
    }

    /// User patterns plus [`DEFAULT_EXCLUDES`]
    pub fn with_defaults<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut rules = Self::new(DEFAULT_EXCLUDES);
        rules.rules.extend(Self::new(patterns).rules);
        rules
    }

    /// Check a `/`-separated path relative to the scan root
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(relative_path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// One-shot form of [`ExcludeRules::is_excluded`]
pub fn should_exclude<S: AsRef<str>>(relative_path: &str, patterns: &[S]) -> bool {
    ExcludeRules::new(patterns).is_excluded(relative_path)
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_rule() {
        let patterns = ["node_modules/"];

        assert!(should_exclude("node_modules/pkg/file.js", &patterns));
        assert!(should_exclude("node_modules", &patterns));
        assert!(!should_exclude("src/file.js", &patterns));
        assert!(!should_exclude("node_modules_old/file.js", &patterns));
    }

    #[test]
    fn test_glob_on_base_name() {
        let patterns = ["*.log"];

        assert!(should_exclude("a.log", &patterns));
        assert!(should_exclude("deep/nested/b.log", &patterns));
        assert!(!should_exclude("a.txt", &patterns));
    }

    #[test]
    fn test_exact_full_path() {
        let patterns = ["build/output.bin"];

        assert!(should_exclude("build/output.bin", &patterns));
        assert!(!should_exclude("other/output.bin", &patterns));
    }

    #[test]
    fn test_plain_name_matches_anywhere() {
        let patterns = ["target"];

        assert!(should_exclude("target", &patterns));
        assert!(should_exclude("crates/foo/target", &patterns));
    }

    #[test]
    fn test_no_patterns_excludes_nothing() {
        let patterns: [&str; 0] = [];

        assert!(!should_exclude("anything", &patterns));
        assert!(!should_exclude("", &patterns));
    }

    #[test]
    fn test_invalid_glob_falls_back_to_exact() {
        let patterns = ["[broken"];

        assert!(should_exclude("[broken", &patterns));
        assert!(!should_exclude("broken", &patterns));
    }

    #[test]
    fn test_defaults_include_state_files() {
        let rules = ExcludeRules::with_defaults(&["*.tmp"]);

        assert!(rules.is_excluded(".sync_state"));
        assert!(rules.is_excluded(".sync_state.tmp"));
        assert!(rules.is_excluded("photos/.DS_Store"));
        assert!(rules.is_excluded("x.tmp"));
        assert!(!rules.is_excluded("x.txt"));
    }

    #[test]
    fn test_empty_patterns_are_ignored() {
        let rules = ExcludeRules::new(&["", "/"]);

        assert!(rules.is_empty());
    }
}

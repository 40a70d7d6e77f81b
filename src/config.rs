//! Configuration for a test run

use crate::precondition;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

/// Default file-name pattern for test scripts
pub const DEFAULT_PATTERN: &str = "test*.txt";

/// How much per-test detail the report prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// One character per test
    #[default]
    Normal = 1,
    /// One line per test with its name and outcome
    Verbose = 2,
}

impl Verbosity {
    /// Pick the tier from the presence of a verbose flag
    pub fn from_flag(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Numeric tier (1 or 2)
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Settings threaded through preconditions, discovery, execution and reporting
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Report detail level
    pub verbosity: Verbosity,
    /// Skip scripts marked `slow`
    pub quick: bool,
    /// Log tier for the harness and the tools scripts launch
    pub log_level: LevelFilter,
    /// File-name pattern discovery matches (`*` and `?` wildcards)
    pub pattern: String,
    /// Where per-test work directories are created (system temp dir if unset)
    pub workdir_root: Option<PathBuf>,
    /// Keep the work directory of failed tests for inspection
    pub preserve_work_on_failure: bool,
    /// Named conditions scripts can test with `[name]`
    pub conditions: HashMap<String, bool>,
}

impl RunConfig {
    /// Create a configuration with defaults for the current platform
    pub fn new() -> Self {
        let mut conditions = HashMap::new();

        conditions.insert("unix".to_string(), cfg!(unix));
        conditions.insert("windows".to_string(), cfg!(windows));
        conditions.insert("linux".to_string(), cfg!(target_os = "linux"));
        conditions.insert("macos".to_string(), cfg!(target_os = "macos"));
        conditions.insert("root".to_string(), precondition::is_root());
        conditions.insert("quick".to_string(), false);

        let preserve_work_on_failure = std::env::var("PRESERVE_WORK")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        RunConfig {
            verbosity: Verbosity::Normal,
            quick: false,
            log_level: LevelFilter::WARN,
            pattern: DEFAULT_PATTERN.to_string(),
            workdir_root: None,
            preserve_work_on_failure,
            conditions,
        }
    }

    /// Set the report verbosity
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Enable or disable quick mode
    pub fn quick(mut self, quick: bool) -> Self {
        self.quick = quick;
        self.conditions.insert("quick".to_string(), quick);
        self
    }

    /// Set the log tier
    pub fn log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Set the discovery file-name pattern
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Create work directories under `root`
    pub fn workdir_root(mut self, root: impl AsRef<Path>) -> Self {
        self.workdir_root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Keep work directories of failing tests
    pub fn preserve_work_on_failure(mut self, preserve: bool) -> Self {
        self.preserve_work_on_failure = preserve;
        self
    }

    /// Set a condition value
    pub fn condition(mut self, name: &str, value: bool) -> Self {
        self.conditions.insert(name.to_string(), value);
        self
    }

    /// Directory the harness creates work directories in
    pub fn work_parent(&self) -> PathBuf {
        self.workdir_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_tiers() {
        assert_eq!(Verbosity::from_flag(false).level(), 1);
        assert_eq!(Verbosity::from_flag(true).level(), 2);
        assert!(Verbosity::Verbose > Verbosity::Normal);
    }

    #[test]
    fn defaults() {
        let config = RunConfig::new();
        assert_eq!(config.verbosity, Verbosity::Normal);
        assert_eq!(config.log_level, LevelFilter::WARN);
        assert_eq!(config.pattern, DEFAULT_PATTERN);
        assert!(!config.quick);
        assert_eq!(config.conditions.get("unix"), Some(&cfg!(unix)));
    }

    #[test]
    fn quick_sets_condition() {
        let config = RunConfig::new().quick(true);
        assert!(config.quick);
        assert_eq!(config.conditions.get("quick"), Some(&true));
    }

    #[test]
    fn work_parent_prefers_configured_root() {
        let config = RunConfig::new().workdir_root("/srv/work");
        assert_eq!(config.work_parent(), PathBuf::from("/srv/work"));
        assert_eq!(RunConfig::new().work_parent(), std::env::temp_dir());
    }
}

//! End-to-end test run
//!
//! Preconditions, then discovery, then execution through a colorized
//! stream. Any precondition or discovery error aborts the run before a
//! single test starts; per-test problems are only counted.

use crate::color::{ColorStream, Interactive};
use crate::config::RunConfig;
use crate::discover::discover;
use crate::error::Result;
use crate::precondition::{Preconditions, SystemPreconditions};
use crate::report::{RunSummary, TextRunner};
use crate::run::run_case;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Exit status for a finished run: 0 on success, 1 otherwise
pub fn exit_status(summary: &RunSummary) -> u8 {
    if summary.was_successful() {
        0
    } else {
        1
    }
}

/// Drives one run with a fixed configuration
pub struct Orchestrator<P = SystemPreconditions> {
    config: RunConfig,
    preconditions: P,
}

impl Orchestrator<SystemPreconditions> {
    /// Orchestrate with the real system checks
    pub fn new(config: RunConfig) -> Self {
        Self::with_preconditions(config, SystemPreconditions)
    }
}

impl<P: Preconditions> Orchestrator<P> {
    /// Orchestrate with custom precondition checks
    pub fn with_preconditions(config: RunConfig, preconditions: P) -> Self {
        Orchestrator {
            config,
            preconditions,
        }
    }

    /// The configuration every collaborator receives
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Check preconditions, discover `test_dir`, run it and report to `sink`
    ///
    /// # Errors
    /// Precondition failures and discovery failures. Failing tests are not
    /// errors; they show up in the returned summary.
    pub fn run<W>(&self, test_dir: &Path, sink: &mut W) -> Result<RunSummary>
    where
        W: Write + Interactive + ?Sized,
    {
        self.preconditions.ensure_privileges(&self.config)?;
        let cleanup = self.preconditions.cleanup(&self.config);
        if !cleanup.is_clean() {
            warn!(
                failed = cleanup.failed.len(),
                "some leftover state could not be cleaned up"
            );
        }
        debug!(removed = cleanup.removed.len(), "preconditions checked");

        let suite = discover(test_dir, &self.config.pattern)?;
        info!(
            tests = suite.len(),
            dir = %test_dir.display(),
            "discovered tests"
        );

        let mut stream = ColorStream::new(sink)?;
        let summary = TextRunner::new(&mut stream, self.config.verbosity)
            .run(&suite, |case| run_case(case, &self.config));
        stream.flush()?;

        info!(
            run = summary.tests_run,
            failures = summary.failures.len(),
            errors = summary.errors.len(),
            skipped = summary.skipped.len(),
            "run finished"
        );
        Ok(summary)
    }

    /// Run and report to this process's standard output
    pub fn run_to_stdout(&self, test_dir: &Path) -> Result<RunSummary> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.run(test_dir, &mut lock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::precondition::CleanupOutcome;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        allow: bool,
        calls: RefCell<Vec<&'static str>>,
    }

    impl Preconditions for Recorder {
        fn ensure_privileges(&self, _config: &RunConfig) -> Result<()> {
            self.calls.borrow_mut().push("privileges");
            if self.allow {
                Ok(())
            } else {
                Err(Error::Privilege("not root".to_string()))
            }
        }

        fn cleanup(&self, _config: &RunConfig) -> CleanupOutcome {
            self.calls.borrow_mut().push("cleanup");
            CleanupOutcome::default()
        }
    }

    fn config(dir: &TempDir) -> RunConfig {
        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        RunConfig::new().workdir_root(work)
    }

    #[test]
    fn preconditions_run_in_order_before_tests() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("test_ok.txt"), "exists WORK_MARKER\n-- WORK_MARKER --\n").unwrap();

        let recorder = Recorder {
            allow: true,
            ..Default::default()
        };
        let orchestrator = Orchestrator::with_preconditions(config(&dir), recorder);
        let mut out = Vec::new();
        let summary = orchestrator.run(dir.path(), &mut out).unwrap();

        assert_eq!(*orchestrator.preconditions.calls.borrow(), vec!["privileges", "cleanup"]);
        assert!(summary.was_successful());
        assert_eq!(exit_status(&summary), 0);
        assert!(String::from_utf8(out).unwrap().ends_with("OK\n"));
    }

    #[test]
    fn privilege_failure_aborts_before_output() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("test_ok.txt"), "").unwrap();

        let orchestrator = Orchestrator::with_preconditions(config(&dir), Recorder::default());
        let mut out = Vec::new();
        let err = orchestrator.run(dir.path(), &mut out).unwrap_err();

        assert!(matches!(err, Error::Privilege(_)));
        assert!(out.is_empty());
        assert_eq!(*orchestrator.preconditions.calls.borrow(), vec!["privileges"]);
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let recorder = Recorder {
            allow: true,
            ..Default::default()
        };
        let orchestrator = Orchestrator::with_preconditions(config(&dir), recorder);
        let mut out = Vec::new();
        let err = orchestrator.run(&dir.path().join("missing"), &mut out).unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn failing_test_gives_exit_status_one() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("test_bad.txt"), "exists nothing-here\n").unwrap();
        let recorder = Recorder {
            allow: true,
            ..Default::default()
        };
        let orchestrator = Orchestrator::with_preconditions(config(&dir), recorder);
        let mut out = Vec::new();
        let summary = orchestrator.run(dir.path(), &mut out).unwrap();
        assert_eq!(exit_status(&summary), 1);
    }
}

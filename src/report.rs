//! Text report in the classic unittest layout
//!
//! ```text
//! test_basic ... ok
//! test_link ... FAIL
//! test_slow ... skipped 'slow test skipped in quick mode'
//!
//! ======================================================================
//! FAIL: test_link
//! ----------------------------------------------------------------------
//! Error in testdata/test_link.txt at line 2:
//! ...
//!
//! ----------------------------------------------------------------------
//! Ran 3 tests in 0.041s
//!
//! FAILED (failures=1, skipped=1)
//! ```
//!
//! At the normal verbosity the per-test lines collapse to one character per
//! test (`.`, `F`, `E`, `s`).

use crate::config::Verbosity;
use crate::discover::{Suite, TestCase};
use crate::run::Outcome;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::warn;

const SEPARATOR1: &str =
    "======================================================================";
const SEPARATOR2: &str =
    "----------------------------------------------------------------------";

/// Aggregated result of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Number of tests executed (skips included)
    pub tests_run: usize,
    /// `(test name, detail)` for every failed assertion
    pub failures: Vec<(String, String)>,
    /// `(test name, detail)` for every test that could not run properly
    pub errors: Vec<(String, String)>,
    /// `(test name, reason)` for every skipped test
    pub skipped: Vec<(String, String)>,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

impl RunSummary {
    /// True iff nothing failed and nothing errored
    pub fn was_successful(&self) -> bool {
        self.failures.is_empty() && self.errors.is_empty()
    }

    /// Final status line, e.g. `OK (skipped=1)` or `FAILED (failures=2)`
    pub fn status_line(&self) -> String {
        if self.tests_run == 0 {
            return "NO TESTS RAN".to_string();
        }

        let mut infos = Vec::new();
        if !self.failures.is_empty() {
            infos.push(format!("failures={}", self.failures.len()));
        }
        if !self.errors.is_empty() {
            infos.push(format!("errors={}", self.errors.len()));
        }
        if !self.skipped.is_empty() {
            infos.push(format!("skipped={}", self.skipped.len()));
        }

        let status = if self.was_successful() { "OK" } else { "FAILED" };
        if infos.is_empty() {
            status.to_string()
        } else {
            format!("{} ({})", status, infos.join(", "))
        }
    }

    fn record(&mut self, case: &TestCase, outcome: Outcome) {
        self.tests_run += 1;
        let name = case.name.clone();
        match outcome {
            Outcome::Passed => {}
            Outcome::Failed(detail) => self.failures.push((name, detail)),
            Outcome::Errored(detail) => self.errors.push((name, detail)),
            Outcome::Skipped(reason) => self.skipped.push((name, reason)),
        }
    }
}

/// Writes the report for one run to a stream
///
/// Every line goes out in a single write so a wrapping
/// [`ColorStream`](crate::color::ColorStream) always sees whole status words.
/// Write errors are logged once and otherwise ignored: a broken report must
/// not change the result of the run.
pub struct TextRunner<'w> {
    stream: &'w mut dyn Write,
    verbosity: Verbosity,
    write_failed: bool,
}

impl<'w> TextRunner<'w> {
    /// Report to `stream` at the given verbosity
    pub fn new(stream: &'w mut dyn Write, verbosity: Verbosity) -> Self {
        TextRunner {
            stream,
            verbosity,
            write_failed: false,
        }
    }

    /// Run every case of `suite` through `execute` and report as we go
    pub fn run<F>(&mut self, suite: &Suite, mut execute: F) -> RunSummary
    where
        F: FnMut(&TestCase) -> Outcome,
    {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        for case in suite.iter() {
            if self.verbosity == Verbosity::Verbose {
                self.emit(&format!("{} ... ", case.name));
            }
            let outcome = execute(case);
            self.report_outcome(&outcome);
            summary.record(case, outcome);
        }

        summary.elapsed = started.elapsed();
        self.print_errors(&summary);
        self.print_summary(&summary);
        summary
    }

    fn report_outcome(&mut self, outcome: &Outcome) {
        let text = match (self.verbosity, outcome) {
            (Verbosity::Verbose, Outcome::Passed) => "ok\n".to_string(),
            (Verbosity::Verbose, Outcome::Failed(_)) => "FAIL\n".to_string(),
            (Verbosity::Verbose, Outcome::Errored(_)) => "ERROR\n".to_string(),
            (Verbosity::Verbose, Outcome::Skipped(reason)) => format!("skipped '{}'\n", reason),
            (Verbosity::Normal, Outcome::Passed) => ".".to_string(),
            (Verbosity::Normal, Outcome::Failed(_)) => "F".to_string(),
            (Verbosity::Normal, Outcome::Errored(_)) => "E".to_string(),
            (Verbosity::Normal, Outcome::Skipped(_)) => "s".to_string(),
        };
        self.emit(&text);
    }

    fn print_errors(&mut self, summary: &RunSummary) {
        if summary.tests_run > 0 {
            self.emit("\n");
        }
        for (flavour, list) in [("ERROR", &summary.errors), ("FAIL", &summary.failures)] {
            for (name, detail) in list {
                self.emit(&format!(
                    "{}\n{}: {}\n{}\n{}\n\n",
                    SEPARATOR1,
                    flavour,
                    name,
                    SEPARATOR2,
                    detail.trim_end()
                ));
            }
        }
    }

    fn print_summary(&mut self, summary: &RunSummary) {
        let run = summary.tests_run;
        self.emit(&format!(
            "{}\nRan {} test{} in {:.3}s\n\n{}\n",
            SEPARATOR2,
            run,
            if run == 1 { "" } else { "s" },
            summary.elapsed.as_secs_f64(),
            summary.status_line()
        ));
    }

    fn emit(&mut self, text: &str) {
        let result = self
            .stream
            .write_all(text.as_bytes())
            .and_then(|()| self.stream.flush());
        if let Err(err) = result {
            if !self.write_failed {
                warn!(error = %err, "cannot write test report");
                self.write_failed = true;
            }
        }
    }
}

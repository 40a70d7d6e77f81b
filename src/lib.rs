//! # testrunner-rs
//!
//! A test harness for filesystem-based test scripts. It discovers every
//! `test*.txt` script under a directory, runs each one in an isolated work
//! directory and prints a unittest-style report. Status words in the report
//! (`ok`, `FAIL`, `skipped`) are colored when standard output is a terminal.
//!
//! ```no_run
//! use std::path::Path;
//! use testrunner_rs::{exit_status, Orchestrator, RunConfig, Verbosity};
//!
//! let config = RunConfig::new().verbosity(Verbosity::Verbose);
//! let summary = Orchestrator::new(config)
//!     .run_to_stdout(Path::new("testdata"))
//!     .unwrap();
//! std::process::exit(exit_status(&summary).into());
//! ```

pub mod color;
pub mod config;
pub mod discover;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod precondition;
pub mod report;
pub mod run;

pub use color::{ColorStream, FlushOutcome, Highlighter, Interactive};
pub use config::{RunConfig, Verbosity};
pub use discover::{discover, Suite, TestCase};
pub use error::{Error, Result};
pub use orchestrator::{exit_status, Orchestrator};
pub use parser::{Command, Script, ScriptFile};
pub use precondition::{CleanupOutcome, Preconditions, SystemPreconditions};
pub use report::{RunSummary, TextRunner};
pub use run::{run_case, Outcome, TestEnvironment};

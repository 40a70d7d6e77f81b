//! Test execution module

pub mod commands;
pub mod environment;
pub mod execution;

// Re-export public types
pub use commands::Flow;
pub use environment::TestEnvironment;
pub use execution::{run_case, run_script};

use crate::error::Error;

/// How a single test ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every command succeeded
    Passed,
    /// An assertion did not hold; carries the report detail
    Failed(String),
    /// The test could not run properly; carries the report detail
    Errored(String),
    /// The test chose not to run; carries the reason
    Skipped(String),
}

impl Outcome {
    /// Classify a script error as a failure or an error
    pub fn from_error(err: &Error) -> Self {
        let detail = match err {
            Error::ScriptError { source, .. } => format!("{}\n{}", err, source),
            other => other.to_string(),
        };
        if err.is_failure() {
            Outcome::Failed(detail)
        } else {
            Outcome::Errored(detail)
        }
    }

    /// Short name used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed(_) => "failed",
            Outcome::Errored(_) => "errored",
            Outcome::Skipped(_) => "skipped",
        }
    }
}

//! Error types for testrunner-rs

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for harness operations
#[derive(Error, Debug)]
pub enum Error {
    /// Regex error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WalkDir error
    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Parse error in test script
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Command execution error
    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },

    /// File comparison error
    #[error("File comparison failed: {message}")]
    FileCompare { message: String },

    /// Output comparison error
    #[error("Output comparison failed: expected {expected}, got {actual}")]
    OutputCompare { expected: String, actual: String },

    /// Unknown command error
    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    /// Unknown condition error
    #[error("Unknown condition: {condition}")]
    UnknownCondition { condition: String },

    /// The suite directory could not be scanned
    #[error("Cannot discover tests in {}: {message}", root.display())]
    Discovery { root: PathBuf, message: String },

    /// The process lacks the privileges the suite requires
    #[error("Insufficient privileges: {0}")]
    Privilege(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),

    /// Script execution error with context
    #[error("Error in {script_file} at line {line_num}:\n{context}")]
    ScriptError {
        script_file: String,
        line_num: usize,
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a parse error
    pub fn parse_error(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a command error
    pub fn command_error(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a discovery error for the given suite root
    pub fn discovery_error(root: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Discovery {
            root: root.into(),
            message: message.into(),
        }
    }

    /// Create a script error with context
    pub fn script_error(
        script_file: impl Into<String>,
        line_num: usize,
        script_content: &str,
        source: Error,
    ) -> Self {
        let context = generate_error_context(script_content, line_num);
        Error::ScriptError {
            script_file: script_file.into(),
            line_num,
            context,
            source: Box::new(source),
        }
    }

    /// Whether this error is an assertion failure rather than a broken test
    ///
    /// Failures count as `FAIL` in the report; everything else is an `ERROR`.
    pub fn is_failure(&self) -> bool {
        match self {
            Error::Command { .. } | Error::FileCompare { .. } | Error::OutputCompare { .. } => true,
            Error::ScriptError { source, .. } => source.is_failure(),
            _ => false,
        }
    }
}

/// Generate error context showing surrounding lines
fn generate_error_context(script_content: &str, error_line: usize) -> String {
    let lines: Vec<&str> = script_content.lines().collect();
    let mut context = String::new();

    let start = error_line.saturating_sub(1).max(1);
    let end = (error_line + 1).min(lines.len());

    for line_num in start..=end {
        let line_content = lines.get(line_num - 1).unwrap_or(&"");
        let marker = if line_num == error_line { '>' } else { ' ' };
        context.push_str(&format!("{} {:>3} | {}\n", marker, line_num, line_content));
    }

    context.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_errors_are_failures() {
        assert!(Error::command_error("exec", "exit status 1").is_failure());
        assert!(Error::OutputCompare {
            expected: "a".into(),
            actual: "b".into()
        }
        .is_failure());
        assert!(!Error::parse_error(3, "bad").is_failure());
        assert!(!Error::UnknownCommand {
            command: "frob".into()
        }
        .is_failure());
    }

    #[test]
    fn script_error_classification_follows_source() {
        let content = "exec true\nexec false\nstdout x";
        let err = Error::script_error("t.txt", 2, content, Error::command_error("exec", "boom"));
        assert!(err.is_failure());

        let err = Error::script_error("t.txt", 2, content, Error::Generic("io".into()));
        assert!(!err.is_failure());
    }

    #[test]
    fn error_context_marks_line() {
        let content = "one\ntwo\nthree\nfour";
        let context = generate_error_context(content, 3);
        assert_eq!(context, "    2 | two\n>   3 | three\n    4 | four");
    }
}

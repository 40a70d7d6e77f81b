//! testrunner command-line entry point
//!
//! Run all bundled test scripts:
//!
//! ```text
//! testrunner [-v] [--quick] [DIR]
//! ```
//!
//! `-v` prints one line per test. `--quick` (also accepted as `-quick`)
//! skips scripts marked `slow`.

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use testrunner_rs::{exit_status, Orchestrator, RunConfig, Verbosity};
use tracing::warn;

/// Discover and run test scripts, coloring the report on a terminal
#[derive(Parser, Debug)]
#[command(name = "testrunner", version, about)]
struct Cli {
    /// Print each test's name and outcome
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Skip tests marked `slow`
    #[arg(short, long, action = ArgAction::Count)]
    quick: u8,

    /// Directory to search for tests [default: the harness's testdata];
    /// only the first one is used
    #[arg(value_name = "DIR")]
    dirs: Vec<PathBuf>,
}

/// Command line ready for clap, plus the tokens it will never see
struct Args {
    known: Vec<OsString>,
    ignored: Vec<OsString>,
}

/// Whether clap would accept `arg` as one of our flags
fn is_known_flag(cmd: &clap::Command, arg: &str) -> bool {
    if let Some(long) = arg.strip_prefix("--") {
        return cmd.get_arguments().any(|a| a.get_long() == Some(long));
    }
    match arg.strip_prefix('-') {
        Some(shorts) if !shorts.is_empty() => shorts
            .chars()
            .all(|c| cmd.get_arguments().any(|a| a.get_short() == Some(c))),
        _ => false,
    }
}

/// Accept `-quick` as `--quick` and drop flags we do not know
///
/// Flags are only tested for presence, so a stray option must never turn
/// into a usage error.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Args {
    let mut cmd = Cli::command();
    cmd.build();

    let mut args = args.into_iter();
    let mut known: Vec<OsString> = args.next().into_iter().collect();
    let mut ignored = Vec::new();
    for arg in args {
        let text = arg.to_string_lossy().into_owned();
        if text == "-quick" {
            known.push(OsString::from("--quick"));
        } else if text.starts_with('-') && text != "-" && !is_known_flag(&cmd, &text) {
            ignored.push(arg);
        } else {
            known.push(arg);
        }
    }
    Args { known, ignored }
}

/// Test scripts shipped alongside the harness
fn default_test_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn init_logging(config: &RunConfig) {
    // RUST_LOG wins; otherwise only warnings and errors
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_string())),
        )
        .init();
}

fn run(cli: Cli, config: RunConfig) -> Result<u8> {
    if cli.dirs.len() > 1 {
        warn!(extra = cli.dirs.len() - 1, "only the first directory is searched");
    }
    let dir = cli.dirs.into_iter().next().unwrap_or_else(default_test_dir);
    let summary = Orchestrator::new(config)
        .run_to_stdout(&dir)
        .with_context(|| format!("test run in {} aborted", dir.display()))?;
    Ok(exit_status(&summary))
}

fn main() -> ExitCode {
    let args = normalize_args(std::env::args_os());
    let cli = Cli::parse_from(args.known);
    let config = RunConfig::new()
        .verbosity(Verbosity::from_flag(cli.verbose > 0))
        .quick(cli.quick > 0);
    init_logging(&config);
    for arg in &args.ignored {
        warn!(arg = %arg.to_string_lossy(), "ignoring unrecognized argument");
    }

    match run(cli, config) {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(normalize_args(args.iter().map(OsString::from)).known)
    }

    #[test]
    fn flags() {
        let cli = parse(&["testrunner"]);
        assert!(cli.verbose == 0 && cli.quick == 0 && cli.dirs.is_empty());

        let cli = parse(&["testrunner", "-v", "-quick"]);
        assert!(cli.verbose > 0 && cli.quick > 0);

        let cli = parse(&["testrunner", "--quick", "suite"]);
        assert!(cli.quick > 0);
        assert_eq!(cli.dirs, vec![PathBuf::from("suite")]);
    }

    #[test]
    fn repeated_flags_are_accepted() {
        let cli = parse(&["testrunner", "-v", "-v", "--verbose", "-quick", "-q"]);
        assert_eq!(cli.verbose, 3);
        assert_eq!(cli.quick, 2);

        let cli = parse(&["testrunner", "-vq"]);
        assert!(cli.verbose > 0 && cli.quick > 0);
    }

    #[test]
    fn unknown_flags_are_dropped() {
        let args = normalize_args(
            ["testrunner", "-x", "--frobnicate", "-vz", "suite", "-v"]
                .iter()
                .map(OsString::from),
        );
        assert_eq!(args.ignored, vec!["-x", "--frobnicate", "-vz"]);

        let cli = Cli::parse_from(args.known);
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.dirs, vec![PathBuf::from("suite")]);
    }

    #[test]
    fn extra_directories_are_accepted() {
        let cli = parse(&["testrunner", "first", "second"]);
        assert_eq!(cli.dirs.len(), 2);
    }

    #[test]
    fn default_dir_is_next_to_the_manifest() {
        assert!(default_test_dir().ends_with("testdata"));
        assert!(default_test_dir().is_dir());
    }
}

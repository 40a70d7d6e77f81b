//! Running one script end to end

use crate::config::RunConfig;
use crate::discover::TestCase;
use crate::error::{Error, Result};
use crate::run::commands::Flow;
use crate::run::environment::TestEnvironment;
use crate::run::Outcome;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Reason reported for slow scripts in quick mode
pub const QUICK_SKIP_REASON: &str = "slow test skipped in quick mode";

/// Run one discovered test and classify how it ended
///
/// Never fails: problems with the script itself become
/// [`Outcome::Errored`].
pub fn run_case(case: &TestCase, config: &RunConfig) -> Outcome {
    debug!(test = %case.name, "running");
    let outcome = match run_script(&case.path, config) {
        Ok(outcome) => outcome,
        Err(err) => Outcome::from_error(&err),
    };
    debug!(test = %case.name, outcome = outcome.label(), "finished");
    outcome
}

/// Run the script at `script_path`
///
/// Returns [`Outcome::Passed`] or [`Outcome::Skipped`]; failing commands
/// come back as an [`Error::ScriptError`] pointing at the offending line.
pub fn run_script(script_path: &Path, config: &RunConfig) -> Result<Outcome> {
    let content = fs::read_to_string(script_path)?;
    let script_file = script_path.to_string_lossy().to_string();

    let script = crate::parser::parse(&content).map_err(|e| {
        let line = match &e {
            Error::Parse { line, .. } => Some(*line),
            _ => None,
        };
        match line {
            Some(line) => Error::script_error(&script_file, line, &content, e),
            None => e,
        }
    })?;

    if config.quick && script.is_slow() {
        return Ok(Outcome::Skipped(QUICK_SKIP_REASON.to_string()));
    }

    let mut env = TestEnvironment::new(config)?;
    env.setup_files(&script.files)?;

    for command in &script.commands {
        match env.run_command(command, config) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Skip(reason)) => return Ok(Outcome::Skipped(reason)),
            Err(e) => {
                let err = Error::script_error(&script_file, command.line_num, &content, e);
                if config.preserve_work_on_failure {
                    let kept = env.preserve_work_dir();
                    warn!(
                        script = %script_file,
                        work_dir = %kept.display(),
                        "test did not pass, work directory preserved"
                    );
                }
                return Err(err);
            }
        }
    }

    Ok(Outcome::Passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn script(dir: &TempDir, body: &str) -> TestCase {
        let path = dir.path().join("test_case.txt");
        fs::write(&path, body).unwrap();
        TestCase {
            name: "test_case".to_string(),
            path,
        }
    }

    fn config(dir: &TempDir) -> RunConfig {
        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        RunConfig::new()
            .workdir_root(work)
            .preserve_work_on_failure(false)
    }

    #[test]
    fn passing_script() {
        let dir = TempDir::new().unwrap();
        let case = script(&dir, "exists a.txt\ncmp a.txt b.txt\n-- a.txt --\nx\n-- b.txt --\nx\n");
        assert_eq!(run_case(&case, &config(&dir)), Outcome::Passed);
    }

    #[test]
    fn assertion_is_a_failure() {
        let dir = TempDir::new().unwrap();
        let case = script(&dir, "exists a.txt\nexists missing.txt\n-- a.txt --\n");
        match run_case(&case, &config(&dir)) {
            Outcome::Failed(detail) => {
                assert!(detail.contains("line 2"), "{}", detail);
                assert!(detail.contains("missing.txt"), "{}", detail);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn broken_script_is_an_error() {
        let dir = TempDir::new().unwrap();
        let case = script(&dir, "frobnicate now\n");
        assert!(matches!(run_case(&case, &config(&dir)), Outcome::Errored(_)));

        let case = script(&dir, "[unix exists x\n");
        assert!(matches!(run_case(&case, &config(&dir)), Outcome::Errored(_)));
    }

    #[test]
    fn skip_stops_the_script() {
        let dir = TempDir::new().unwrap();
        let case = script(&dir, "skip not on this host\nfrobnicate\n");
        assert_eq!(
            run_case(&case, &config(&dir)),
            Outcome::Skipped("not on this host".to_string())
        );
    }

    #[test]
    fn quick_mode_skips_slow_scripts() {
        let dir = TempDir::new().unwrap();
        let case = script(&dir, "slow\nexists missing.txt\n");
        assert_eq!(
            run_case(&case, &config(&dir).quick(true)),
            Outcome::Skipped(QUICK_SKIP_REASON.to_string())
        );
        assert!(matches!(run_case(&case, &config(&dir)), Outcome::Failed(_)));
    }

    #[test]
    fn work_dir_is_removed_unless_preserved() {
        let dir = TempDir::new().unwrap();
        let case = script(&dir, "exists missing.txt\n");
        let work = dir.path().join("work");

        run_case(&case, &config(&dir));
        assert_eq!(fs::read_dir(&work).unwrap().count(), 0);

        run_case(&case, &config(&dir).preserve_work_on_failure(true));
        assert_eq!(fs::read_dir(&work).unwrap().count(), 1);
    }
}

//! Built-in script commands

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::parser::Command;
use crate::run::environment::TestEnvironment;
use std::fs;

/// What the script should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Go on with the next command
    Continue,
    /// Stop here and report the test as skipped
    Skip(String),
}

impl TestEnvironment {
    /// Run one command, honoring its condition and negation
    pub fn run_command(&mut self, command: &Command, config: &RunConfig) -> Result<Flow> {
        if let Some(condition) = &command.condition {
            if !condition_met(condition, config)? {
                return Ok(Flow::Continue);
            }
        }

        let result = self.dispatch(command);
        if !command.negated {
            return result;
        }

        match result {
            Ok(Flow::Continue) => Err(Error::command_error(
                &command.name,
                "expected failure but command succeeded",
            )),
            Err(e) if e.is_failure() => Ok(Flow::Continue),
            other => other,
        }
    }

    fn dispatch(&mut self, command: &Command) -> Result<Flow> {
        let args: Vec<String> = command
            .args
            .iter()
            .map(|a| self.substitute_env_vars(a))
            .collect();

        match command.name.as_str() {
            "exec" => {
                let (program, rest) = args
                    .split_first()
                    .ok_or_else(|| usage("exec", "program [args...]"))?;
                let output = self.execute(program, rest)?;
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(Error::command_error(
                        "exec",
                        format!(
                            "'{}' exited with {}: {}",
                            program,
                            output
                                .status
                                .code()
                                .map_or_else(|| "a signal".to_string(), |c| format!("status {}", c)),
                            stderr.trim()
                        ),
                    ));
                }
            }
            "stdout" | "stderr" => {
                // compare_output substitutes variables itself
                let [expected] = command.args.as_slice() else {
                    return Err(usage(&command.name, "pattern"));
                };
                let expected = if expected == "-" { "" } else { expected.as_str() };
                self.compare_output(&command.name, expected)?;
            }
            "exists" => {
                if args.is_empty() {
                    return Err(usage("exists", "path..."));
                }
                for path in &args {
                    if !self.resolve(path)?.exists() {
                        return Err(Error::command_error(
                            "exists",
                            format!("'{}' does not exist", path),
                        ));
                    }
                }
            }
            "cmp" => {
                let [left, right] = args.as_slice() else {
                    return Err(usage("cmp", "file1 file2"));
                };
                self.compare_files(left, right)?;
            }
            "env" => {
                for arg in &args {
                    let (key, value) = arg.split_once('=').ok_or_else(|| {
                        Error::Generic(format!("env: expected KEY=VALUE, got '{}'", arg))
                    })?;
                    self.set_env_var(key, value);
                }
            }
            "cd" => {
                let [dir] = args.as_slice() else {
                    return Err(usage("cd", "dir"));
                };
                self.change_directory(dir)?;
            }
            "mkdir" => {
                for dir in &args {
                    fs::create_dir_all(self.resolve(dir)?)?;
                }
            }
            "skip" => {
                let reason = if args.is_empty() {
                    "skipped by script".to_string()
                } else {
                    args.join(" ")
                };
                return Ok(Flow::Skip(reason));
            }
            // Marker read before the run starts.
            "slow" => {}
            _ => {
                return Err(Error::UnknownCommand {
                    command: command.name.clone(),
                })
            }
        }

        Ok(Flow::Continue)
    }
}

fn usage(command: &str, synopsis: &str) -> Error {
    Error::Generic(format!("usage: {} {}", command, synopsis))
}

/// Evaluate a `[condition]` prefix
///
/// Known names come from the run configuration; `exec:prog` checks `PATH`
/// and `env:VAR` checks the harness's own environment. `!` negates.
pub fn condition_met(condition: &str, config: &RunConfig) -> Result<bool> {
    if let Some(inner) = condition.strip_prefix('!') {
        return condition_met(inner, config).map(|met| !met);
    }
    if let Some(value) = config.conditions.get(condition) {
        return Ok(*value);
    }
    if let Some(var) = condition.strip_prefix("env:") {
        return Ok(std::env::var_os(var).is_some());
    }
    if let Some(program) = condition.strip_prefix("exec:") {
        return Ok(program_exists(program));
    }
    Err(Error::UnknownCondition {
        condition: condition.to_string(),
    })
}

/// Whether `program` can be found on `PATH`
fn program_exists(program: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| {
        let candidate = dir.join(program);
        candidate.is_file() || (cfg!(windows) && candidate.with_extension("exe").is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cmd(line: &str) -> Command {
        crate::parser::parse(line).unwrap().commands.remove(0)
    }

    #[test]
    fn conditions() {
        let config = RunConfig::new().condition("net", false);
        assert_eq!(condition_met("unix", &config).unwrap(), cfg!(unix));
        assert!(!condition_met("net", &config).unwrap());
        assert!(condition_met("!net", &config).unwrap());
        assert!(matches!(
            condition_met("bogus", &config),
            Err(Error::UnknownCondition { .. })
        ));
        assert!(!condition_met("exec:surely-not-a-real-program-xyz", &config).unwrap());
        assert!(!condition_met("env:SURELY_NOT_SET_XYZ_123", &config).unwrap());
    }

    #[test]
    fn false_condition_skips_command() {
        let root = TempDir::new().unwrap();
        let config = RunConfig::new().workdir_root(root.path()).condition("net", false);
        let mut env = TestEnvironment::new(&config).unwrap();
        let flow = env.run_command(&cmd("[net] frobnicate"), &config).unwrap();
        assert_eq!(flow, Flow::Continue);
    }

    #[test]
    fn negation_inverts_failures_only() {
        let root = TempDir::new().unwrap();
        let config = RunConfig::new().workdir_root(root.path());
        let mut env = TestEnvironment::new(&config).unwrap();

        assert_eq!(env.run_command(&cmd("! exists gone.txt"), &config).unwrap(), Flow::Continue);

        std::fs::write(env.work_dir.join("here.txt"), "").unwrap();
        let err = env.run_command(&cmd("! exists here.txt"), &config).unwrap_err();
        assert!(err.is_failure());

        let err = env.run_command(&cmd("! frobnicate"), &config).unwrap_err();
        assert!(matches!(err, Error::UnknownCommand { .. }));
    }

    #[test]
    fn skip_and_env() {
        let root = TempDir::new().unwrap();
        let config = RunConfig::new().workdir_root(root.path());
        let mut env = TestEnvironment::new(&config).unwrap();

        env.run_command(&cmd("env GREETING=hi"), &config).unwrap();
        assert_eq!(env.env_vars.get("GREETING").map(String::as_str), Some("hi"));

        let flow = env.run_command(&cmd("skip needs a bridge"), &config).unwrap();
        assert_eq!(flow, Flow::Skip("needs a bridge".to_string()));
    }

    #[test]
    fn mkdir_and_cd() {
        let root = TempDir::new().unwrap();
        let config = RunConfig::new().workdir_root(root.path());
        let mut env = TestEnvironment::new(&config).unwrap();

        env.run_command(&cmd("mkdir sub/deeper"), &config).unwrap();
        env.run_command(&cmd("cd sub"), &config).unwrap();
        assert_eq!(env.current_dir, env.work_dir.join("sub"));
        assert!(env.run_command(&cmd("cd nope"), &config).is_err());
    }
}

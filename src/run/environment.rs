//! Per-test work directory and process state

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::parser::ScriptFile;
use crate::precondition::WORKDIR_PREFIX;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::{Command as StdCommand, Output};
use tempfile::TempDir;

/// Isolated environment one script runs in
pub struct TestEnvironment {
    /// Root of the temporary work directory
    pub work_dir: PathBuf,
    /// Removes the work directory on drop unless preserved
    temp_dir: TempDir,
    /// Variables visible to launched programs and `$VAR` substitution
    pub env_vars: HashMap<String, String>,
    /// Directory programs run in, always inside `work_dir`
    pub current_dir: PathBuf,
    /// Output of the last `exec`
    pub last_output: Option<Output>,
    var_pattern: Regex,
}

impl TestEnvironment {
    /// Create a fresh work directory for one script
    ///
    /// `$WORK` points at the directory and `RUST_LOG` carries the run's log
    /// tier to launched programs.
    pub fn new(config: &RunConfig) -> Result<Self> {
        let parent = config.work_parent();
        let temp_dir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| {
                Error::Generic(format!(
                    "Cannot create work directory in {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        let work_dir = temp_dir.path().to_path_buf();

        let mut env_vars = HashMap::new();
        env_vars.insert("WORK".to_string(), work_dir.to_string_lossy().to_string());
        env_vars.insert("RUST_LOG".to_string(), config.log_level.to_string());

        Ok(TestEnvironment {
            current_dir: work_dir.clone(),
            work_dir,
            temp_dir,
            env_vars,
            last_output: None,
            var_pattern: Regex::new(r"\$\$|\$\{(\w+)\}|\$(\w+)")?,
        })
    }

    /// Write the script's inline files into the work directory
    pub fn setup_files(&self, files: &[ScriptFile]) -> Result<()> {
        for file in files {
            let path = self.resolve(&file.name)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &file.contents)?;
        }
        Ok(())
    }

    /// Resolve a script-relative path, refusing anything outside the work dir
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let path = Path::new(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::Generic(format!(
                "Path '{}' must stay inside the work directory",
                relative
            )));
        }
        Ok(self.current_dir.join(path))
    }

    /// Run a program to completion and remember its output
    pub fn execute(&mut self, program: &str, args: &[String]) -> Result<Output> {
        let program_path = if program.contains('/') {
            self.current_dir.join(program)
        } else {
            PathBuf::from(program)
        };

        let output = StdCommand::new(&program_path)
            .args(args)
            .current_dir(&self.current_dir)
            .envs(&self.env_vars)
            .output()
            .map_err(|e| Error::Generic(format!("Cannot run '{}': {}", program, e)))?;

        self.last_output = Some(output.clone());
        Ok(output)
    }

    /// Change the directory programs run in
    pub fn change_directory(&mut self, path: &str) -> Result<()> {
        let new_dir = self.resolve(path)?;
        if !new_dir.is_dir() {
            return Err(Error::command_error(
                "cd",
                format!("'{}' is not a directory", path),
            ));
        }
        self.current_dir = new_dir;
        Ok(())
    }

    /// Compare two files byte for byte
    pub fn compare_files(&self, left: &str, right: &str) -> Result<()> {
        let read = |name: &str| {
            self.resolve(name).and_then(|p| {
                fs::read(&p).map_err(|e| {
                    Error::command_error("cmp", format!("Cannot read '{}': {}", name, e))
                })
            })
        };
        let (a, b) = (read(left)?, read(right)?);

        if a != b {
            return Err(Error::FileCompare {
                message: format!(
                    "'{}' and '{}' differ:\n--- {}\n{}\n--- {}\n{}",
                    left,
                    right,
                    left,
                    String::from_utf8_lossy(&a),
                    right,
                    String::from_utf8_lossy(&b)
                ),
            });
        }
        Ok(())
    }

    /// Check the last program's stdout or stderr against `expected`
    ///
    /// `expected` is a regex when it contains regex metacharacters and an
    /// exact match (ignoring trailing whitespace) otherwise.
    pub fn compare_output(&self, stream: &str, expected: &str) -> Result<()> {
        let output = self
            .last_output
            .as_ref()
            .ok_or_else(|| Error::Generic(format!("{}: no program has run yet", stream)))?;
        let raw = match stream {
            "stdout" => &output.stdout,
            "stderr" => &output.stderr,
            other => return Err(Error::Generic(format!("Unknown output stream '{}'", other))),
        };
        let actual = String::from_utf8_lossy(raw).trim_end().to_string();
        let expected = self.substitute_env_vars(expected);

        let matched = if is_pattern(&expected) {
            Regex::new(&format!("(?s){}", expected))?.is_match(&actual)
        } else {
            actual == expected
        };

        if matched {
            Ok(())
        } else {
            Err(Error::OutputCompare { expected, actual })
        }
    }

    /// Set a variable for later commands
    pub fn set_env_var(&mut self, key: &str, value: &str) {
        self.env_vars.insert(key.to_string(), value.to_string());
    }

    /// Expand `$VAR`, `${VAR}` and `$$` (a literal `$`)
    ///
    /// Unknown variables are left as written.
    pub fn substitute_env_vars(&self, input: &str) -> String {
        self.var_pattern
            .replace_all(input, |caps: &Captures<'_>| {
                let Some(name) = caps.get(1).or_else(|| caps.get(2)) else {
                    return "$".to_string();
                };
                self.env_vars
                    .get(name.as_str())
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Keep the work directory on disk and return its path
    pub fn preserve_work_dir(self) -> PathBuf {
        self.temp_dir.keep()
    }
}

/// Whether an expectation should be treated as a regex
fn is_pattern(expected: &str) -> bool {
    expected.contains(['^', '$', '[', '(', '*', '.', '+', '?', '|', '\\'])
}

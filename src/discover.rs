//! Test discovery
//!
//! Walks a directory tree and collects every script whose file name matches
//! a glob-style pattern into a [`Suite`]. Cases are sorted by name so the same
//! directory contents always produce the same suite.

use crate::error::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// One runnable test script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Path relative to the suite root, extension dropped, `/`-separated
    pub name: String,
    /// Location of the script on disk
    pub path: PathBuf,
}

/// All tests found under one directory
#[derive(Debug, Clone, Default)]
pub struct Suite {
    /// Directory the suite was discovered from
    pub root: PathBuf,
    /// Test cases in run order
    pub cases: Vec<TestCase>,
}

impl Suite {
    /// Number of test cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether no test was found
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Iterate over the cases in run order
    pub fn iter(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.iter()
    }
}

/// Discover every script under `root` whose file name matches `pattern`
///
/// `pattern` supports `*` (any run of characters) and `?` (one character).
/// Hidden directories are not descended into.
///
/// # Errors
/// Returns [`Error::Discovery`] when `root` is missing or not a directory,
/// and [`Error::WalkDir`] when part of the tree cannot be read.
pub fn discover(root: &Path, pattern: &str) -> Result<Suite> {
    if !root.exists() {
        return Err(Error::discovery_error(root, "directory does not exist"));
    }
    if !root.is_dir() {
        return Err(Error::discovery_error(root, "not a directory"));
    }

    let matcher = glob_to_regex(pattern)?;
    let mut cases = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if matcher.is_match(file_name) {
            let path = entry.into_path();
            let name = case_name(root, &path);
            debug!(test = %name, path = %path.display(), "discovered test");
            cases.push(TestCase { name, path });
        }
    }

    cases.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Suite {
        root: root.to_path_buf(),
        cases,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Turn a glob like `test*.txt` into an anchored regex
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');
    Ok(Regex::new(&re)?)
}

fn case_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

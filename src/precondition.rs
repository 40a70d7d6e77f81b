//! Environment checks performed before any test runs

use crate::config::RunConfig;
use crate::error::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Prefix of every work directory the harness creates
pub const WORKDIR_PREFIX: &str = "testrunner-";

/// What a best-effort cleanup managed to do
#[derive(Debug, Default)]
pub struct CleanupOutcome {
    /// Leftover directories that were deleted
    pub removed: Vec<PathBuf>,
    /// Leftover directories that could not be deleted, with the reason
    pub failed: Vec<(PathBuf, io::Error)>,
}

impl CleanupOutcome {
    /// Nothing was left behind after cleanup
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Checks run once, in order, before discovery
pub trait Preconditions {
    /// Fail unless the process has the privileges the suite needs
    fn ensure_privileges(&self, config: &RunConfig) -> Result<()>;

    /// Remove state left over from earlier runs; never fails the run
    fn cleanup(&self, config: &RunConfig) -> CleanupOutcome;
}

/// Real checks against the running system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPreconditions;

impl Preconditions for SystemPreconditions {
    fn ensure_privileges(&self, _config: &RunConfig) -> Result<()> {
        match effective_uid() {
            Some(0) => Ok(()),
            Some(uid) => Err(Error::Privilege(format!(
                "tests must run as root (effective uid is {})",
                uid
            ))),
            None => Err(Error::Privilege(
                "cannot determine the effective user id".to_string(),
            )),
        }
    }

    fn cleanup(&self, config: &RunConfig) -> CleanupOutcome {
        remove_stale_workdirs(&config.work_parent())
    }
}

/// Effective user id of this process, if the platform has one
#[cfg(unix)]
pub fn effective_uid() -> Option<u32> {
    // SAFETY: geteuid takes no arguments and cannot fail.
    Some(unsafe { libc::geteuid() })
}

/// Effective user id of this process, if the platform has one
#[cfg(not(unix))]
pub fn effective_uid() -> Option<u32> {
    None
}

/// Whether the process runs with root privileges
pub fn is_root() -> bool {
    static ROOT: OnceLock<bool> = OnceLock::new();
    *ROOT.get_or_init(|| effective_uid() == Some(0))
}

/// Delete every harness work directory directly under `parent`
///
/// This includes the live work directories of another run sharing
/// `parent`; concurrent runs need distinct work parents.
pub fn remove_stale_workdirs(parent: &Path) -> CleanupOutcome {
    let mut outcome = CleanupOutcome::default();

    for entry in WalkDir::new(parent).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(parent = %parent.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let is_leftover = entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(WORKDIR_PREFIX));
        if !is_leftover {
            continue;
        }

        let path = entry.into_path();
        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                info!(path = %path.display(), "removed leftover work directory");
                outcome.removed.push(path);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not remove leftover work directory");
                outcome.failed.push((path, err));
            }
        }
    }

    outcome
}

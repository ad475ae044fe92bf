//! Staging directory lifetime.

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::{debug, warn};

/// An extracted submission. Temporary stagings are removed by [`finish`]
/// or, failing that, on drop.
///
/// [`finish`]: StagedSubmission::finish
#[derive(Debug)]
pub struct StagedSubmission {
    dir: Utf8PathBuf,
    remove_on_finish: bool,
}

impl StagedSubmission {
    pub fn new(dir: Utf8PathBuf, remove_on_finish: bool) -> Self {
        Self {
            dir,
            remove_on_finish,
        }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    pub fn is_temporary(&self) -> bool {
        self.remove_on_finish
    }

    /// Remove a temporary staging directory. Kept stagings are left alone
    /// and their path is returned.
    pub fn finish(mut self) -> Option<Utf8PathBuf> {
        if self.remove_on_finish {
            self.remove_on_finish = false;
            remove(&self.dir);
            None
        } else {
            Some(self.dir.clone())
        }
    }
}

impl Drop for StagedSubmission {
    fn drop(&mut self) {
        if self.remove_on_finish {
            remove(&self.dir);
        }
    }
}

fn remove(dir: &Utf8Path) {
    if !dir.exists() {
        return;
    }
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!(dir = %dir, "removed staging directory"),
        Err(err) => warn!(dir = %dir, error = %err, "cannot remove staging directory"),
    }
}

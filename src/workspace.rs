//! Scratch directory for the file-sharded strategy.
//!
//! A workspace is only ever created in, or adopted from, an empty
//! directory, so removing it can never destroy data the run did not write.
//! [`TempWorkspace::release`] is the normal exit; dropping an unreleased
//! workspace removes it and everything in it on a best-effort basis, which
//! covers every failure path after acquisition.

use crate::error::{MergeError, Result};
use crate::format::Encoding;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Default scratch directory name, unique per process and start time.
#[must_use]
pub fn default_temp_dir() -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    PathBuf::from(format!("slow5merge_{secs}_{}", std::process::id()))
}

#[derive(Debug)]
pub struct TempWorkspace {
    path: PathBuf,
    released: bool,
}

impl TempWorkspace {
    /// Create `path`, or adopt it if it already exists and is empty.
    ///
    /// # Errors
    /// [`MergeError::WorkspaceNotEmpty`] if `path` has any entry; nothing in it
    /// is touched. [`MergeError::Io`] if it cannot be created or listed.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            let mut entries = fs::read_dir(&path).map_err(|e| MergeError::io(&path, e))?;
            if entries.next().is_some() {
                return Err(MergeError::WorkspaceNotEmpty { path });
            }
            debug!(path = %path.display(), "adopting empty temporary directory");
        } else {
            fs::create_dir_all(&path).map_err(|e| MergeError::io(&path, e))?;
            debug!(path = %path.display(), "created temporary directory");
        }
        Ok(Self {
            path,
            released: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the part file for work item `item`. Named by position,
    /// never by source file name.
    #[must_use]
    pub fn part_path(&self, item: usize, encoding: Encoding) -> PathBuf {
        self.path.join(format!("{item}.{}", encoding.extension()))
    }

    /// Remove the directory. Every part file must already be gone.
    ///
    /// # Errors
    /// [`MergeError::Io`] if the directory cannot be removed, including when
    /// it still has entries.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_dir(&self.path).map_err(|e| MergeError::io(&self.path, e))?;
        debug!(path = %self.path.display(), "removed temporary directory");
        Ok(())
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "could not remove temporary directory");
        }
    }
}

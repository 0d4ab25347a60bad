//! Input discovery: turn command-line arguments into an ordered file list.
//!
//! Each argument is resolved on its own and results are concatenated in
//! argument order:
//!
//! - **Directory** - walked recursively; every `.slow5` / `.blow5` file is
//!   collected, sorted by path
//! - **File** - taken as-is, whatever its extension
//! - **Anything else** - treated as a glob pattern (`runs/*/*.blow5`)
//!
//! # Examples
//!
//! ```no_run
//! use slow5merge::io::glob::expand_inputs;
//!
//! let files = expand_inputs(&["runs/", "extra/*.slow5"])?;
//! # use anyhow::Error; Ok::<(), Error>(())
//! ```

use crate::format::Encoding;
use anyhow::{Context, Result};
use glob::glob;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

/// Resolve every argument into input files, preserving argument order.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed or a pattern is invalid.
/// An argument that matches nothing contributes no files and is not an error.
pub fn expand_inputs<S: AsRef<str>>(args: &[S]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for arg in args {
        let arg = arg.as_ref();
        let path = Path::new(arg);
        if path.is_dir() {
            let mut found = Vec::new();
            walk_dir(path, &mut found)?;
            found.sort();
            out.extend(found);
        } else if path.is_file() {
            out.push(path.to_path_buf());
        } else {
            out.extend(expand_glob(arg)?);
        }
    }
    Ok(out)
}

/// Expand a glob pattern into a sorted vector of matching file paths.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or a matched entry cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = read_dir(dir).with_context(|| format!("list directory {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("read entry in {}", dir.display()))?
            .path();
        if path.is_dir() {
            walk_dir(&path, out)?;
        } else if Encoding::from_path(&path).is_some() {
            out.push(path);
        }
    }
    Ok(())
}

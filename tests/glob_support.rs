//! Input discovery over directories, files and glob patterns.

use anyhow::Result;
use slow5merge::io::glob::{expand_glob, expand_inputs};
use std::fs::{create_dir_all, write};
use tempfile::TempDir;

#[test]
fn directories_are_walked_recursively_and_sorted() -> Result<()> {
    let dir = TempDir::new()?;
    let base = dir.path();
    create_dir_all(base.join("run2/pass"))?;
    create_dir_all(base.join("run1"))?;
    write(base.join("run2/pass/b.blow5"), b"")?;
    write(base.join("run1/a.slow5"), b"")?;
    write(base.join("run1/notes.txt"), b"")?;
    write(base.join("run2/c.blow5"), b"")?;

    let files = expand_inputs(&[base.to_string_lossy()])?;

    assert_eq!(
        files,
        vec![
            base.join("run1/a.slow5"),
            base.join("run2/c.blow5"),
            base.join("run2/pass/b.blow5"),
        ]
    );
    Ok(())
}

#[test]
fn arguments_keep_their_order() -> Result<()> {
    let dir = TempDir::new()?;
    let base = dir.path();
    create_dir_all(base.join("d"))?;
    write(base.join("d/x.blow5"), b"")?;
    write(base.join("z.slow5"), b"")?;
    write(base.join("odd.name"), b"")?;

    let args = [
        base.join("z.slow5").to_string_lossy().into_owned(),
        base.join("d").to_string_lossy().into_owned(),
        base.join("odd.name").to_string_lossy().into_owned(),
    ];
    let files = expand_inputs(&args)?;

    assert_eq!(
        files,
        vec![base.join("z.slow5"), base.join("d/x.blow5"), base.join("odd.name")]
    );
    Ok(())
}

#[test]
fn glob_patterns_match_files_only() -> Result<()> {
    let dir = TempDir::new()?;
    let base = dir.path();
    create_dir_all(base.join("sub.blow5"))?;
    write(base.join("b.blow5"), b"")?;
    write(base.join("a.blow5"), b"")?;
    write(base.join("a.slow5"), b"")?;

    let files = expand_glob(&format!("{}/*.blow5", base.display()))?;

    assert_eq!(files, vec![base.join("a.blow5"), base.join("b.blow5")]);
    Ok(())
}

#[test]
fn nothing_found_is_not_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let pattern = format!("{}/missing/*.blow5", dir.path().display());
    assert!(expand_inputs(&[pattern])?.is_empty());
    Ok(())
}

#[test]
fn invalid_pattern_is_an_error() {
    assert!(expand_glob("runs/[unclosed").is_err());
}

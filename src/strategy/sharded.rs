//! File-sharded strategy: whole input files as work items.

use crate::dispatch;
use crate::error::{MergeError, Result};
use crate::io::reader::Slow5Reader;
use crate::io::writer::Slow5Writer;
use crate::metrics::MetricsCollector;
use crate::reconcile::{Reconciliation, SourceFile};
use crate::reencode::Reencoder;
use crate::workspace::TempWorkspace;
use anyhow::Context;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Re-encoded records of one input, waiting in the workspace.
#[derive(Debug)]
pub struct PartFile {
    pub path: PathBuf,
    pub records: u64,
}

/// Re-encode every input into its own part file in parallel, then splice
/// the parts into `writer` in input order, deleting each once copied.
///
/// On error, part files already written stay in the workspace; the caller
/// drops the workspace to remove them.
///
/// # Errors
/// [`MergeError::Dispatch`] if any input fails to re-encode;
/// [`MergeError::Io`] if a part file cannot be read or deleted;
/// [`MergeError::Output`] if the output cannot be written.
pub fn merge<W: Write>(
    rec: &Reconciliation,
    reencoder: &Reencoder,
    threads: usize,
    workspace: &TempWorkspace,
    writer: &mut Slow5Writer<W>,
    metrics: &mut MetricsCollector,
) -> Result<()> {
    let encoding = writer.header().encoding;
    let parts = metrics.time_phase("process", || {
        dispatch::run(threads, rec.sources.len(), |i| {
            write_part(&rec.sources[i], reencoder, &workspace.part_path(i, encoding))
        })
    })?;
    info!(
        files = parts.len(),
        threads,
        "re-encoded inputs into part files"
    );

    metrics.time_phase("assemble", || concatenate(&parts, writer))
}

/// Stream one input through the re-encoder into a private part file.
///
/// # Errors
/// Returns an error if the input cannot be read, a record cannot be
/// re-encoded, or the part file cannot be written.
pub fn write_part(src: &SourceFile, reencoder: &Reencoder, path: &Path) -> anyhow::Result<PartFile> {
    let mut reader = Slow5Reader::open(&src.path)?;
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    let mut records = 0u64;
    while let Some(raw) = reader.next_raw()? {
        let framed = reencoder
            .reencode_raw(&raw, &src.ctx, &src.table)
            .with_context(|| format!("record #{records} of {}", src.path.display()))?;
        w.write_all(&framed)
            .with_context(|| format!("write {}", path.display()))?;
        records += 1;
    }
    w.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(PartFile {
        path: path.to_path_buf(),
        records,
    })
}

/// Copy part files byte-for-byte into `writer`, in slice order.
///
/// # Errors
/// See [`merge`].
pub fn concatenate<W: Write>(parts: &[PartFile], writer: &mut Slow5Writer<W>) -> Result<()> {
    for part in parts {
        let f = File::open(&part.path).map_err(|e| MergeError::io(&part.path, e))?;
        writer
            .append_raw(BufReader::new(f), part.records)
            .with_context(|| format!("splice {}", part.path.display()))
            .map_err(MergeError::Output)?;
        fs::remove_file(&part.path).map_err(|e| MergeError::io(&part.path, e))?;
    }
    Ok(())
}

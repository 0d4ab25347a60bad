//! Read group reconciliation.
//!
//! Every input numbers its read groups from zero. [`reconcile`] walks the
//! inputs once, in order, and folds their groups into one global numbering
//! keyed by run id, producing a [`TranslationTable`] per accepted input and
//! the merged [`Header`].

use crate::error::{MergeError, Result};
use crate::format::{Compression, Encoding};
use crate::header::{Header, HeaderBuilder};
use crate::io::codec::RecordContext;
use crate::io::reader::Slow5Reader;
use anyhow::anyhow;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Local-to-global read group mapping for one input file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslationTable {
    global: Vec<u32>,
}

impl TranslationTable {
    #[must_use]
    pub fn new(global: Vec<u32>) -> Self {
        Self { global }
    }

    /// Global index of local group `local`.
    ///
    /// # Errors
    /// Returns an error if `local` is outside the file's read group range.
    pub fn translate(&self, local: u32) -> anyhow::Result<u32> {
        self.global.get(local as usize).copied().ok_or_else(|| {
            anyhow!(
                "read group {local} out of range (file declares {})",
                self.global.len()
            )
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.global.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.global
    }
}

/// An accepted input: where it is, how to decode it, how to renumber it.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub ctx: RecordContext,
    pub table: TranslationTable,
}

/// An input left out of the merge, with the reason.
#[derive(Clone, Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of [`reconcile`]. Read-only from here on.
#[derive(Clone, Debug)]
pub struct Reconciliation {
    pub header: Header,
    pub sources: Vec<SourceFile>,
    pub skipped: Vec<SkippedFile>,
}

impl Reconciliation {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TranslationTable> {
        self.sources.iter().map(|s| &s.table)
    }
}

/// Reconcile the headers of `files` into one global read group space.
///
/// Inputs that cannot be opened, have no read groups, have a group without a
/// run id, or hold no records are skipped with a warning and contribute
/// nothing to the numbering. With `lossless` set, an input without auxiliary
/// fields aborts the whole call, as does an accepted input declaring an
/// auxiliary field with a different type than an earlier one.
///
/// # Errors
/// [`MergeError::LosslessPrecondition`] and [`MergeError::AuxTypeConflict`]
/// as described above;
/// [`MergeError::Format`] if the global group count overflows.
pub fn reconcile(
    files: &[PathBuf],
    encoding: Encoding,
    compression: Compression,
    lossless: bool,
) -> Result<Reconciliation> {
    let mut builder = HeaderBuilder::new(encoding, compression, lossless);
    let mut sources = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    for path in files {
        let mut skip = |reason: String| {
            warn!(path = %path.display(), "skipping input: {reason}");
            skipped.push(SkippedFile {
                path: path.clone(),
                reason,
            });
        };

        let mut reader = match Slow5Reader::open(path) {
            Ok(r) => r,
            Err(e) => {
                skip(format!("{e:#}"));
                continue;
            }
        };
        let header = reader.header().clone();

        if lossless && header.aux.is_none() {
            return Err(MergeError::LosslessPrecondition { path: path.clone() });
        }
        if header.groups.is_empty() {
            skip("no read groups".to_string());
            continue;
        }
        if let Some(j) = header.groups.iter().position(|g| g.run_id().is_none()) {
            skip(format!("read group {j} has no run_id"));
            continue;
        }
        match reader.next_raw() {
            Ok(Some(_)) => {}
            Ok(None) => {
                skip("no records".to_string());
                continue;
            }
            Err(e) => {
                skip(format!("{e:#}"));
                continue;
            }
        }

        if let Some(aux) = &header.aux
            && let Some((known, found)) = builder.aux_conflict(aux)
        {
            return Err(MergeError::AuxTypeConflict {
                path: path.clone(),
                field: found.name.clone(),
                merged: known.ty,
                found: found.ty,
            });
        }

        let global = header
            .groups
            .iter()
            .map(|g| builder.intern(g))
            .collect::<anyhow::Result<Vec<_>>>()?;
        if let Some(aux) = &header.aux {
            builder.merge_aux(aux);
        }
        debug!(
            path = %path.display(),
            local = header.group_count(),
            global = builder.group_count(),
            "reconciled read groups"
        );

        sources.push(SourceFile {
            path: path.clone(),
            ctx: RecordContext::of(&header),
            table: TranslationTable::new(global),
        });
    }

    Ok(Reconciliation {
        header: builder.freeze(),
        sources,
        skipped,
    })
}

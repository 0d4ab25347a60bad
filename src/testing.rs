//! Fixtures for tests of merge pipelines.
//!
//! [`InputFileBuilder`] writes small `.slow5` / `.blow5` inputs with chosen
//! read groups, auxiliary schema and records; [`read_all`] loads a merged
//! file back for inspection.
//!
//! ```no_run
//! use slow5merge::Encoding;
//! use slow5merge::testing::*;
//! # fn main() -> anyhow::Result<()> {
//! let dir = scratch_dir()?;
//! let path = InputFileBuilder::new(Encoding::Binary)
//!     .group("run-a")
//!     .aux(sample_aux_spec())
//!     .record(sample_record("read-1", 0))
//!     .write(dir.path().join("a.blow5"))?;
//! let (header, records) = read_all(&path)?;
//! assert_eq!(header.group_count(), 1);
//! assert_eq!(records.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::format::{Compression, Encoding};
use crate::header::{AuxField, AuxSpec, AuxType, Header, HeaderBuilder, ReadGroup};
use crate::io::reader::Slow5Reader;
use crate::io::writer::Slow5Writer;
use crate::record::{AuxValue, Record};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fresh temporary directory, removed when the handle drops.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn scratch_dir() -> Result<TempDir> {
    tempfile::tempdir().context("create scratch directory")
}

/// Auxiliary schema shaped like the fields sequencers usually emit.
#[must_use]
pub fn sample_aux_spec() -> AuxSpec {
    AuxSpec::new(vec![
        AuxField::new("channel_number", AuxType::Str),
        AuxField::new("median_before", AuxType::Double),
        AuxField::new("read_number", AuxType::Int32),
        AuxField::new("start_mux", AuxType::UInt8),
        AuxField::new("start_time", AuxType::UInt64),
    ])
}

/// Deterministic record for `read_id` in local group `read_group`, with
/// values for every field of [`sample_aux_spec`].
#[must_use]
pub fn sample_record(read_id: &str, read_group: u32) -> Record {
    let seed = read_id
        .bytes()
        .fold(0i32, |acc, b| acc.wrapping_mul(31).wrapping_add(i32::from(b)));
    let raw_signal = (0..16)
        .map(|i| (seed.wrapping_add(i * 7).rem_euclid(2000) + 100) as i16)
        .collect();
    let aux = BTreeMap::from([
        (
            "channel_number".to_string(),
            AuxValue::Str(format!("{}", seed.rem_euclid(512))),
        ),
        ("median_before".to_string(), AuxValue::Float(215.5)),
        (
            "read_number".to_string(),
            AuxValue::Int(i64::from(seed.rem_euclid(10_000))),
        ),
        ("start_mux".to_string(), AuxValue::UInt(1)),
        ("start_time".to_string(), AuxValue::UInt(u64::from(seed.unsigned_abs()))),
    ]);
    Record {
        read_id: read_id.to_string(),
        read_group,
        digitisation: 8192.0,
        offset: 23.0,
        range: 1467.61,
        sampling_rate: 4000.0,
        raw_signal,
        aux,
    }
}

/// Read group identified by `run_id`, with a couple of extra attributes.
#[must_use]
pub fn sample_group(run_id: &str) -> ReadGroup {
    ReadGroup::from_pairs([
        ("run_id", run_id.to_string()),
        ("asic_id", format!("asic-{run_id}")),
        ("exp_start_time", "2021-01-01T00:00:00Z".to_string()),
    ])
}

/// Builder for one input file.
#[derive(Clone, Debug)]
pub struct InputFileBuilder {
    encoding: Encoding,
    compression: Compression,
    groups: Vec<ReadGroup>,
    aux: Option<AuxSpec>,
    records: Vec<Record>,
    eof_marker: bool,
}

impl InputFileBuilder {
    /// Start a file with no groups, no auxiliary schema and no records.
    /// Binary files default to zlib, text files to no compression.
    #[must_use]
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            compression: match encoding {
                Encoding::Binary => Compression::Zlib,
                Encoding::Text => Compression::None,
            },
            groups: Vec::new(),
            aux: None,
            records: Vec::new(),
            eof_marker: true,
        }
    }

    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Add a [`sample_group`] for `run_id`.
    #[must_use]
    pub fn group(self, run_id: &str) -> Self {
        self.read_group(sample_group(run_id))
    }

    #[must_use]
    pub fn read_group(mut self, group: ReadGroup) -> Self {
        self.groups.push(group);
        self
    }

    #[must_use]
    pub fn aux(mut self, spec: AuxSpec) -> Self {
        self.aux = Some(spec);
        self
    }

    #[must_use]
    pub fn record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    #[must_use]
    pub fn records(mut self, records: impl IntoIterator<Item = Record>) -> Self {
        self.records.extend(records);
        self
    }

    /// Leave the end marker off a binary file, as a crashed writer would.
    #[must_use]
    pub fn without_eof_marker(mut self) -> Self {
        self.eof_marker = false;
        self
    }

    /// Header the file will carry.
    #[must_use]
    pub fn header(&self) -> Header {
        let mut header =
            HeaderBuilder::new(self.encoding, self.compression, self.aux.is_some()).freeze();
        header.groups = self.groups.clone();
        header.aux = self.aux.clone();
        header
    }

    /// Write the file to `path` and return the path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut writer = Slow5Writer::new(f, self.header())?;
        for record in &self.records {
            writer
                .write_record(record)
                .with_context(|| format!("write {} to {}", record.read_id, path.display()))?;
        }
        if self.eof_marker {
            writer.finish()?;
        }
        writer.into_inner().flush()?;
        Ok(path.to_path_buf())
    }
}

/// Load a whole file: its header and every record in stream order.
///
/// # Errors
/// Returns an error if the file cannot be opened or any record is unreadable.
pub fn read_all(path: impl AsRef<Path>) -> Result<(Header, Vec<Record>)> {
    let reader = Slow5Reader::open(path)?;
    let header = reader.header().clone();
    let records = reader.collect::<Result<Vec<_>>>()?;
    Ok((header, records))
}

/// Run id of every group in `header`, in index order.
#[must_use]
pub fn run_ids(header: &Header) -> Vec<String> {
    header
        .groups
        .iter()
        .map(|g| g.run_id().unwrap_or_default().to_string())
        .collect()
}

/// Run id a record of `header` refers to.
#[must_use]
pub fn run_id_of<'a>(header: &'a Header, record: &Record) -> Option<&'a str> {
    header.groups.get(record.read_group as usize)?.run_id()
}

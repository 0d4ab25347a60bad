//! Merge orchestration.
//!
//! A [`Runner`] carries the whole configuration of a merge and drives it:
//!
//! 1. validate the configuration
//! 2. acquire the scratch directory (file-sharded mode only)
//! 3. reconcile every input header into one global read group space
//! 4. open the output and write the merged header
//! 5. re-encode and write every record with the selected [`ExecMode`]
//! 6. write the end marker (binary only), flush, release the scratch directory
//!
//! Nothing touches the output before reconciliation has succeeded, and the
//! output handle is only ever written from the calling thread.
//!
//! ```no_run
//! use slow5merge::runner::{ExecMode, OutputTarget, Runner};
//! use std::path::PathBuf;
//! # fn main() -> Result<(), slow5merge::MergeError> {
//! let runner = Runner {
//!     mode: ExecMode::Batched { batch_size: 1024 },
//!     output: OutputTarget::Path("merged.blow5".into()),
//!     ..Default::default()
//! };
//! let summary = runner.run(&[PathBuf::from("a.blow5"), PathBuf::from("b.slow5")])?;
//! println!("{} records", summary.records_written);
//! # Ok(())
//! # }
//! ```

use crate::error::{MergeError, Result};
use crate::format::{Compression, Encoding};
use crate::io::compression::codec_for;
use crate::io::writer::Slow5Writer;
use crate::metrics::{
    BYTES_WRITTEN, FILES_FOUND, FILES_MERGED, FILES_SKIPPED, MetricsCollector, READ_GROUPS,
    RECORDS_WRITTEN,
};
use crate::reconcile::{SkippedFile, reconcile};
use crate::reencode::Reencoder;
use crate::strategy::{batched, sharded};
use crate::workspace::{TempWorkspace, default_temp_dir};
use anyhow::Context;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

pub const DEFAULT_THREADS: usize = 4;
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Concurrency strategy for the record phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecMode {
    /// One work item per input file, via part files in the scratch directory.
    #[default]
    FileSharded,
    /// One work item per record, `batch_size` records in memory at a time.
    Batched { batch_size: usize },
}

/// Where the merged stream goes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputTarget {
    #[default]
    Stdout,
    Path(PathBuf),
}

impl OutputTarget {
    fn open(&self) -> Result<Box<dyn Write>> {
        match self {
            OutputTarget::Stdout => Ok(Box::new(std::io::stdout().lock())),
            OutputTarget::Path(p) => {
                let f = File::create(p).map_err(|e| MergeError::io(p, e))?;
                Ok(Box::new(f))
            }
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => f.write_str("stdout"),
            OutputTarget::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Merge configuration and driver.
#[derive(Clone, Debug)]
pub struct Runner {
    pub mode: ExecMode,
    pub threads: usize,
    pub encoding: Encoding,
    /// `None` picks the encoding's default: zlib for binary, none for text.
    pub compression: Option<Compression>,
    /// Keep auxiliary fields and require every input to have them.
    pub lossless: bool,
    pub output: OutputTarget,
    /// Scratch directory for [`ExecMode::FileSharded`]; `None` derives a
    /// fresh name from the process id and start time.
    pub temp_dir: Option<PathBuf>,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            mode: ExecMode::default(),
            threads: DEFAULT_THREADS,
            encoding: Encoding::Binary,
            compression: None,
            lossless: true,
            output: OutputTarget::Stdout,
            temp_dir: None,
        }
    }
}

/// Record phase setup; the sharded variant owns the scratch directory for
/// the rest of the run.
enum Plan {
    Sharded(TempWorkspace),
    Batched(usize),
}

impl Plan {
    fn release(self) -> Result<()> {
        match self {
            Plan::Sharded(ws) => ws.release(),
            Plan::Batched(_) => Ok(()),
        }
    }
}

/// What a finished merge did.
#[derive(Debug)]
pub struct MergeSummary {
    pub files_found: usize,
    pub files_merged: usize,
    pub skipped: Vec<SkippedFile>,
    pub read_groups: usize,
    pub records_written: u64,
    pub bytes_written: u64,
    /// `false` when no input was usable and no output was produced.
    pub output_written: bool,
    pub metrics: MetricsCollector,
}

impl Runner {
    /// Compression method actually used for the output.
    #[must_use]
    pub fn effective_compression(&self) -> Compression {
        match (self.compression, self.encoding) {
            (Some(c), _) => c,
            (None, Encoding::Binary) => Compression::Zlib,
            (None, Encoding::Text) => Compression::None,
        }
    }

    /// Check the configuration without touching the filesystem.
    ///
    /// # Errors
    /// [`MergeError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let config = |msg: String| Err(MergeError::Config(msg));
        if self.threads == 0 {
            return config("thread count must be at least 1".into());
        }
        if let ExecMode::Batched { batch_size: 0 } = self.mode {
            return config("batch size must be at least 1".into());
        }
        if self.encoding == Encoding::Text && self.compression.is_some() {
            return config("compression is only available for the blow5 format".into());
        }
        if let Err(e) = codec_for(self.effective_compression()) {
            return config(format!("{e:#}"));
        }
        if let OutputTarget::Path(p) = &self.output
            && Encoding::from_path(p) != Some(self.encoding)
        {
            return config(format!(
                "output file {} does not have the .{} extension required by the output format",
                p.display(),
                self.encoding.extension()
            ));
        }
        Ok(())
    }

    /// Merge `inputs` into the configured output.
    ///
    /// Inputs that cannot be used are skipped (see
    /// [`crate::reconcile::reconcile`]). If none is usable the run succeeds
    /// without creating any output.
    ///
    /// # Errors
    /// Any [`MergeError`]. On error the output may be missing, empty or
    /// truncated; the scratch directory is removed either way.
    pub fn run(&self, inputs: &[PathBuf]) -> Result<MergeSummary> {
        self.validate()?;
        let mut metrics = MetricsCollector::new();
        metrics.record_start();
        metrics.set_counter(FILES_FOUND, inputs.len() as u64);

        let plan = match self.mode {
            ExecMode::FileSharded => Plan::Sharded(TempWorkspace::acquire(
                self.temp_dir.clone().unwrap_or_else(default_temp_dir),
            )?),
            ExecMode::Batched { batch_size } => Plan::Batched(batch_size),
        };

        let compression = self.effective_compression();
        let rec = metrics.time_phase("reconcile", || {
            reconcile(inputs, self.encoding, compression, self.lossless)
        })?;
        metrics.set_counter(FILES_MERGED, rec.sources.len() as u64);
        metrics.set_counter(FILES_SKIPPED, rec.skipped.len() as u64);
        metrics.set_counter(READ_GROUPS, rec.header.group_count() as u64);
        info!(
            files = rec.sources.len(),
            skipped = rec.skipped.len(),
            read_groups = rec.header.group_count(),
            "allocated global read group numbers"
        );

        if rec.is_empty() {
            warn!("no usable slow5/blow5 input found; nothing to merge");
            plan.release()?;
            metrics.record_end();
            return Ok(MergeSummary {
                files_found: inputs.len(),
                files_merged: 0,
                skipped: rec.skipped,
                read_groups: 0,
                records_written: 0,
                bytes_written: 0,
                output_written: false,
                metrics,
            });
        }

        let reencoder = Reencoder::for_header(&rec.header)?;
        let out = self.output.open()?;
        let mut writer = Slow5Writer::new(BufWriter::new(out), rec.header.clone())
            .with_context(|| format!("write header to {}", self.output))
            .map_err(MergeError::Output)?;

        match &plan {
            Plan::Sharded(ws) => {
                info!(threads = self.threads, "merging with parallel files");
                sharded::merge(&rec, &reencoder, self.threads, ws, &mut writer, &mut metrics)?;
            }
            Plan::Batched(batch_size) => {
                info!(threads = self.threads, batch_size, "merging in record batches");
                batched::merge(
                    &rec,
                    &reencoder,
                    self.threads,
                    *batch_size,
                    &mut writer,
                    &mut metrics,
                )?;
            }
        }

        writer
            .finish()
            .with_context(|| format!("finish {}", self.output))
            .map_err(MergeError::Output)?;
        let records_written = writer.records_written();
        let bytes_written = writer.bytes_written();
        drop(writer);
        plan.release()?;

        metrics.set_counter(RECORDS_WRITTEN, records_written);
        metrics.set_counter(BYTES_WRITTEN, bytes_written);
        metrics.record_end();
        info!(
            records = records_written,
            output = %self.output,
            elapsed_secs = metrics.elapsed().map(|d| d.as_secs_f64()),
            "merge complete"
        );

        Ok(MergeSummary {
            files_found: inputs.len(),
            files_merged: rec.sources.len(),
            skipped: rec.skipped,
            read_groups: rec.header.group_count(),
            records_written,
            bytes_written,
            output_written: true,
            metrics,
        })
    }
}

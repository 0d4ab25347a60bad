//! # slow5merge
//!
//! Merge any number of SLOW5 (text) and BLOW5 (binary) nanopore signal files
//! into one, renumbering read groups so that every record in the output still
//! points at the metadata of the run it came from.
//!
//! ## Key Features
//!
//! - **Read group reconciliation** - groups from different inputs that share a
//!   `run_id` collapse into one global group; everything else gets a fresh index
//! - **Two concurrency strategies** - one work item per input file via part
//!   files, or fixed-size record batches spanning files
//! - **Format conversion on the way** - inputs may mix encodings; the output
//!   encoding and record compression are chosen independently
//! - **Lossless or lossy** - keep auxiliary record fields, or drop them
//! - **Safe scratch handling** - the part file directory must start empty and
//!   is removed on every exit path
//!
//! ## Quick Start
//!
//! ```no_run
//! use slow5merge::{ExecMode, OutputTarget, Runner};
//! use slow5merge::io::glob::expand_inputs;
//! # fn main() -> anyhow::Result<()> {
//! let inputs = expand_inputs(&["run1/", "run2/*.blow5"])?;
//! let summary = Runner {
//!     mode: ExecMode::FileSharded,
//!     threads: 8,
//!     output: OutputTarget::Path("merged.blow5".into()),
//!     ..Default::default()
//! }
//! .run(&inputs)?;
//! eprintln!(
//!     "{} records from {} files, {} read groups",
//!     summary.records_written, summary.files_merged, summary.read_groups
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Reconciliation
//!
//! [`reconcile`] reads every input header once, in the order given, and
//! builds the merged [`Header`] plus one translation table per accepted input.
//! After it returns, the header is frozen; workers only ever read it.
//!
//! ### Dispatch
//!
//! [`dispatch::run`] is a fork-join over item indices on a bounded rayon
//! pool. Results come back in item order, so output order never depends on
//! scheduling.
//!
//! ### Strategies
//!
//! - [`strategy::sharded`] writes each input to `<tmp>/<i>.<ext>` in parallel
//!   and splices the parts into the output in input order
//! - [`strategy::batched`] never touches the disk besides the inputs and the
//!   output; it trades that for one work item per record
//!
//! ## Feature Flags
//!
//! - `compression-zlib` (default) - zlib record compression via `flate2`
//! - `compression-zstd` (default) - zstd record compression via `zstd`

pub mod dispatch;
pub mod error;
pub mod format;
pub mod header;
pub mod io;
pub mod metrics;
pub mod reconcile;
pub mod record;
pub mod reencode;
pub mod runner;
pub mod strategy;
pub mod testing;
pub mod workspace;

pub use dispatch::Assignment;
pub use error::{DispatchError, MergeError, Result};
pub use format::{Compression, Encoding};
pub use header::{AuxField, AuxSpec, AuxType, Header, ReadGroup};
pub use io::{Slow5Reader, Slow5Writer};
pub use metrics::MetricsCollector;
pub use reconcile::{Reconciliation, SkippedFile, TranslationTable, reconcile};
pub use record::{AuxValue, Record};
pub use reencode::Reencoder;
pub use runner::{ExecMode, MergeSummary, OutputTarget, Runner};
pub use workspace::TempWorkspace;

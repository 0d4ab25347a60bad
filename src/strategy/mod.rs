//! The two ways of turning reconciled inputs into the merged record stream.
//!
//! Both run the re-encoding in parallel through [`crate::dispatch`] and keep
//! every write to the output on the calling thread.
//!
//! - [`sharded`] - one work item per input file, each written to its own
//!   part file, then spliced into the output in input order
//! - [`batched`] - raw records are read into fixed-size batches spanning
//!   files, re-encoded one item per record, and written in read order

pub mod batched;
pub mod sharded;

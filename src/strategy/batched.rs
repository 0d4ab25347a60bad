//! Batched-record strategy: single records as work items.

use crate::dispatch;
use crate::error::{MergeError, Result};
use crate::io::reader::Slow5Reader;
use crate::io::writer::Slow5Writer;
use crate::metrics::{BATCHES, MetricsCollector};
use crate::reconcile::{Reconciliation, SourceFile};
use crate::record::RawRecord;
use crate::reencode::Reencoder;
use std::io::Write;
use tracing::debug;

/// Pulls raw records from the accepted inputs in order, moving on to the
/// next file whenever the current one runs dry.
pub struct BatchProducer<'a> {
    sources: &'a [SourceFile],
    current: Option<(usize, Slow5Reader)>,
    next_file: usize,
}

impl<'a> BatchProducer<'a> {
    #[must_use]
    pub fn new(sources: &'a [SourceFile]) -> Self {
        Self {
            sources,
            current: None,
            next_file: 0,
        }
    }

    /// Read up to `capacity` raw records. A batch may span several inputs;
    /// each record remembers which one it came from. An empty batch means
    /// every input is exhausted.
    ///
    /// # Errors
    /// [`MergeError::Input`] if an input cannot be reopened or read.
    pub fn fill(&mut self, capacity: usize) -> Result<Vec<RawRecord>> {
        let mut batch = Vec::with_capacity(capacity);
        while batch.len() < capacity {
            let Some((idx, reader)) = self.current.as_mut() else {
                if self.next_file == self.sources.len() {
                    break;
                }
                let path = &self.sources[self.next_file].path;
                let reader = Slow5Reader::open(path).map_err(|source| MergeError::Input {
                    path: path.clone(),
                    source,
                })?;
                self.current = Some((self.next_file, reader));
                self.next_file += 1;
                continue;
            };
            match reader.next_raw() {
                Ok(Some(bytes)) => batch.push(RawRecord {
                    bytes,
                    file_index: *idx,
                }),
                Ok(None) => self.current = None,
                Err(source) => {
                    return Err(MergeError::Input {
                        path: self.sources[*idx].path.clone(),
                        source,
                    });
                }
            }
        }
        Ok(batch)
    }
}

/// Read, re-encode and write the inputs one batch at a time.
///
/// Records are re-encoded out of order across workers but written to
/// `writer` strictly in the order they were read.
///
/// # Errors
/// [`MergeError::Input`] on read failure; [`MergeError::Dispatch`] if any
/// record fails to re-encode; [`MergeError::Output`] on write failure.
pub fn merge<W: Write>(
    rec: &Reconciliation,
    reencoder: &Reencoder,
    threads: usize,
    batch_size: usize,
    writer: &mut Slow5Writer<W>,
    metrics: &mut MetricsCollector,
) -> Result<()> {
    let mut producer = BatchProducer::new(&rec.sources);
    loop {
        let batch = metrics.time_phase("read", || producer.fill(batch_size))?;
        if batch.is_empty() {
            break;
        }

        let encoded = metrics.time_phase("encode", || {
            dispatch::run(threads, batch.len(), |i| {
                let raw = &batch[i];
                let src = &rec.sources[raw.file_index];
                reencoder.reencode_raw(&raw.bytes, &src.ctx, &src.table)
            })
        })?;

        metrics.time_phase("write", || {
            encoded
                .iter()
                .try_for_each(|framed| writer.write_encoded(framed))
                .map_err(MergeError::Output)
        })?;

        metrics.increment_counter(BATCHES, 1);
        debug!(
            records = batch.len(),
            total = writer.records_written(),
            "batch written"
        );
    }
    Ok(())
}

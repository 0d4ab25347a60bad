//! Per-record re-encoding: decode, renumber the read group, encode.
//!
//! A [`Reencoder`] only holds the target format, so one instance is shared
//! by every worker. Each call owns its record from decode to encode and
//! nothing survives the call except the returned bytes.

use crate::format::{Compression, Encoding};
use crate::header::{AuxSpec, Header};
use crate::io::codec::{RecordContext, decode, encode};
use crate::io::compression::codec_for;
use crate::reconcile::TranslationTable;
use crate::record::Record;
use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct Reencoder {
    encoding: Encoding,
    compression: Compression,
    aux: Option<AuxSpec>,
}

impl Reencoder {
    /// Target the format described by the merged header.
    ///
    /// # Errors
    /// Returns an error if the header's compression method is unavailable.
    pub fn for_header(header: &Header) -> Result<Self> {
        codec_for(header.compression)?;
        Ok(Self {
            encoding: header.encoding,
            compression: header.compression,
            aux: header.aux.clone(),
        })
    }

    /// Re-encode one raw record read from a file described by `src`.
    ///
    /// # Errors
    /// Returns an error if the record cannot be decoded, names a read group
    /// the file does not declare, or cannot be encoded.
    pub fn reencode_raw(
        &self,
        raw: &[u8],
        src: &RecordContext,
        table: &TranslationTable,
    ) -> Result<Vec<u8>> {
        let record = decode(raw, src)?;
        self.reencode(record, table)
    }

    /// Renumber `record` through `table` and encode it.
    ///
    /// # Errors
    /// Returns an error if the read group is out of range or encoding fails.
    pub fn reencode(&self, mut record: Record, table: &TranslationTable) -> Result<Vec<u8>> {
        record.read_group = table
            .translate(record.read_group)
            .with_context(|| format!("record {}", record.read_id))?;
        encode(&record, self.aux.as_ref(), self.encoding, self.compression)
    }
}

//! Output side: header block, pre-encoded record bytes, end marker.

use crate::format::{BINARY_EOF, BINARY_MAGIC, Encoding};
use crate::header::Header;
use crate::io::codec::encode;
use crate::record::Record;
use anyhow::{Context, Result};
use std::io::{Read, Write};

/// Serialize `header` in the container format its `encoding` names.
///
/// # Errors
/// Returns an error if the header text is too large for the binary preamble
/// or the write fails.
pub fn write_header<W: Write>(w: &mut W, header: &Header) -> Result<usize> {
    let text = header.render_text();
    match header.encoding {
        Encoding::Text => {
            w.write_all(text.as_bytes())?;
            Ok(text.len())
        }
        Encoding::Binary => {
            let groups = u32::try_from(header.group_count()).context("read group count")?;
            let text_len = u32::try_from(text.len()).context("header text length")?;
            w.write_all(BINARY_MAGIC)?;
            w.write_all(&[
                header.version.major,
                header.version.minor,
                header.version.patch,
                header.compression.to_byte(),
            ])?;
            w.write_all(&groups.to_le_bytes())?;
            w.write_all(&text_len.to_le_bytes())?;
            w.write_all(text.as_bytes())?;
            Ok(BINARY_MAGIC.len() + 12 + text.len())
        }
    }
}

/// Single-owner writer for a merged stream.
///
/// The header goes out in [`Slow5Writer::new`]; the end marker, for the
/// binary encoding only, in [`Slow5Writer::finish`].
pub struct Slow5Writer<W: Write> {
    inner: W,
    header: Header,
    records: u64,
    bytes: u64,
    finished: bool,
}

impl<W: Write> Slow5Writer<W> {
    /// Write `header` to `inner` and return a writer ready for records.
    ///
    /// # Errors
    /// Returns an error if the header cannot be written.
    pub fn new(mut inner: W, header: Header) -> Result<Self> {
        let bytes = write_header(&mut inner, &header).context("write header")? as u64;
        Ok(Self {
            inner,
            header,
            records: 0,
            bytes,
            finished: false,
        })
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Records written so far through [`Self::write_encoded`] or
    /// [`Self::write_record`].
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Append one already framed record.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write_encoded(&mut self, framed: &[u8]) -> Result<()> {
        self.inner.write_all(framed)?;
        self.records += 1;
        self.bytes += framed.len() as u64;
        Ok(())
    }

    /// Encode `record` against this writer's header and append it.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let framed = encode(
            record,
            self.header.aux.as_ref(),
            self.header.encoding,
            self.header.compression,
        )?;
        self.write_encoded(&framed)
    }

    /// Splice `records` framed records from `src` without re-parsing them.
    ///
    /// # Errors
    /// Returns an error if reading `src` or writing fails.
    pub fn append_raw<R: Read>(&mut self, mut src: R, records: u64) -> Result<u64> {
        let n = std::io::copy(&mut src, &mut self.inner)?;
        self.records += records;
        self.bytes += n;
        Ok(n)
    }

    /// Write the end marker when the encoding has one, then flush. Calling
    /// it again only flushes.
    ///
    /// # Errors
    /// Returns an error if the final write or flush fails.
    pub fn finish(&mut self) -> Result<()> {
        if !self.finished && self.header.encoding.has_eof_marker() {
            self.inner.write_all(BINARY_EOF)?;
            self.bytes += BINARY_EOF.len() as u64;
        }
        self.finished = true;
        self.inner.flush()?;
        Ok(())
    }

    /// Hand back the underlying writer. Call [`Self::finish`] first.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

//! Streaming reader over one `.slow5` / `.blow5` file.

use crate::format::{BINARY_EOF, BINARY_MAGIC, Compression, Encoding, Version};
use crate::header::Header;
use crate::io::codec::{RecordContext, decode};
use crate::record::Record;
use anyhow::{Context, Result, bail, ensure};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

const TEXT_MAGIC: &[u8] = b"#slow5_version";

/// Reader yielding raw or decoded records from a single file.
///
/// The header is parsed eagerly by [`Slow5Reader::open`]; records are pulled
/// one at a time and never buffered beyond the underlying `BufReader`.
#[derive(Debug)]
pub struct Slow5Reader {
    path: PathBuf,
    header: Header,
    ctx: RecordContext,
    inner: BufReader<File>,
    finished: bool,
}

impl Slow5Reader {
    /// Open `path` and parse its header.
    ///
    /// The encoding is taken from the extension when it is `.slow5` or
    /// `.blow5`, otherwise from the leading bytes.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its header is malformed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let mut inner = BufReader::new(f);

        let encoding = match Encoding::from_path(&path) {
            Some(e) => e,
            None => detect_from_magic(&mut inner)
                .with_context(|| format!("detect format of {}", path.display()))?,
        };
        let header = match encoding {
            Encoding::Text => read_text_header(&mut inner),
            Encoding::Binary => read_binary_header(&mut inner),
        }
        .with_context(|| format!("read header of {}", path.display()))?;

        Ok(Self {
            ctx: RecordContext::of(&header),
            path,
            header,
            inner,
            finished: false,
        })
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Next record in undecoded form, or `None` at end of stream.
    ///
    /// # Errors
    /// Returns an error on I/O failure, a truncated frame, or a binary file
    /// that ends without its end marker.
    pub fn next_raw(&mut self) -> Result<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }
        let next = match self.header.encoding {
            Encoding::Text => self.next_text_line(),
            Encoding::Binary => self.next_binary_frame(),
        }
        .with_context(|| format!("read record from {}", self.path.display()))?;
        if next.is_none() {
            self.finished = true;
        }
        Ok(next)
    }

    /// Next decoded record, or `None` at end of stream.
    ///
    /// # Errors
    /// Same as [`Slow5Reader::next_raw`], plus decode failures.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        match self.next_raw()? {
            Some(raw) => decode(&raw, &self.ctx)
                .with_context(|| format!("decode record from {}", self.path.display()))
                .map(Some),
            None => Ok(None),
        }
    }

    fn next_text_line(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let mut line = Vec::new();
            if self.inner.read_until(b'\n', &mut line)? == 0 {
                return Ok(None);
            }
            while matches!(line.last(), Some(b'\n' | b'\r')) {
                line.pop();
            }
            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
    }

    fn next_binary_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let mut prefix = [0u8; 8];
        let n = read_up_to(&mut self.inner, &mut prefix)?;
        if n == BINARY_EOF.len() && prefix[..n] == BINARY_EOF[..] {
            let mut trailing = [0u8; 1];
            ensure!(
                read_up_to(&mut self.inner, &mut trailing)? == 0,
                "data after end-of-file marker"
            );
            return Ok(None);
        }
        match n {
            0 => bail!("missing end-of-file marker"),
            8 => {}
            _ => bail!("truncated record length ({n} bytes)"),
        }
        let len = u64::from_le_bytes(prefix);
        let payload = read_exactly(&mut self.inner, len)
            .with_context(|| format!("record payload of {len} bytes"))?;
        Ok(Some(payload))
    }
}

impl Iterator for Slow5Reader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

fn detect_from_magic<R: BufRead>(reader: &mut R) -> Result<Encoding> {
    let buf = reader.fill_buf()?;
    if buf.starts_with(BINARY_MAGIC) {
        Ok(Encoding::Binary)
    } else if buf.starts_with(TEXT_MAGIC) {
        Ok(Encoding::Text)
    } else {
        bail!("not a slow5 or blow5 stream")
    }
}

/// Fill `buf` as far as the stream allows; returns the byte count.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read exactly `len` bytes, growing the buffer only as data arrives.
fn read_exactly<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len).read_to_end(&mut buf)?;
    ensure!(
        buf.len() as u64 == len,
        "truncated: expected {len} bytes, found {}",
        buf.len()
    );
    Ok(buf)
}

fn read_text_header<R: BufRead>(reader: &mut R) -> Result<Header> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        ensure!(reader.read_line(&mut line)? > 0, "header ends prematurely");
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        let done = line.starts_with("#read_id");
        lines.push(line);
        if done {
            break;
        }
    }
    Header::parse_text(&lines, Encoding::Text, Compression::None)
}

fn read_binary_header<R: BufRead>(reader: &mut R) -> Result<Header> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic).context("read magic")?;
    ensure!(&magic == BINARY_MAGIC, "bad magic bytes");

    let mut fixed = [0u8; 12];
    reader.read_exact(&mut fixed).context("read preamble")?;
    let version = Version {
        major: fixed[0],
        minor: fixed[1],
        patch: fixed[2],
    };
    let compression = Compression::from_byte(fixed[3])?;
    let groups = u32::from_le_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]) as usize;
    let text_len = u64::from(u32::from_le_bytes([fixed[8], fixed[9], fixed[10], fixed[11]]));

    let text = read_exactly(reader, text_len).context("read header text")?;
    let text = String::from_utf8(text).context("header text is not UTF-8")?;
    let lines: Vec<&str> = text.lines().collect();
    let header = Header::parse_text(&lines, Encoding::Binary, compression)?;

    ensure!(
        header.version == version,
        "preamble version {version} disagrees with header text version {}",
        header.version
    );
    ensure!(
        header.group_count() == groups,
        "preamble declares {groups} read groups, header text has {}",
        header.group_count()
    );
    Ok(header)
}

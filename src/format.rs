//! File-level format attributes: target encoding, record compression and the
//! fixed byte constants of the binary layout.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Magic bytes opening every binary file.
pub const BINARY_MAGIC: &[u8; 6] = b"BLOW5\x01";

/// End-of-stream marker appended after the last binary record.
pub const BINARY_EOF: &[u8; 5] = b"5WOLB";

/// Record schema version written into every header.
pub const FORMAT_VERSION: Version = Version {
    major: 0,
    minor: 2,
    patch: 0,
};

pub const TEXT_EXTENSION: &str = "slow5";
pub const BINARY_EXTENSION: &str = "blow5";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('.').map(str::parse::<u8>);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch)), None) => Ok(Version {
                major,
                minor,
                patch,
            }),
            _ => bail!("malformed version string {s:?}"),
        }
    }
}

/// On-disk encoding of a record stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// Human-readable, tab separated (`.slow5`).
    Text,
    /// Length-framed, optionally compressed (`.blow5`).
    #[default]
    Binary,
}

impl Encoding {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Text => TEXT_EXTENSION,
            Encoding::Binary => BINARY_EXTENSION,
        }
    }

    /// Encoding implied by a file extension, if it is one we recognise.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            TEXT_EXTENSION => Some(Encoding::Text),
            BINARY_EXTENSION => Some(Encoding::Binary),
            _ => None,
        }
    }

    /// Only the binary encoding carries a trailing end marker.
    #[must_use]
    pub fn has_eof_marker(self) -> bool {
        matches!(self, Encoding::Binary)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Encoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            TEXT_EXTENSION => Ok(Encoding::Text),
            BINARY_EXTENSION => Ok(Encoding::Binary),
            other => bail!("unknown output format {other:?} (expected slow5 or blow5)"),
        }
    }
}

/// Per-record compression method of the binary encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compression {
    None,
    #[default]
    Zlib,
    Zstd,
}

impl Compression {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zlib => "zlib",
            Compression::Zstd => "zstd",
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Zlib => 1,
            Compression::Zstd => 2,
        }
    }

    pub(crate) fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Zlib),
            2 => Ok(Compression::Zstd),
            other => bail!("unknown record compression method {other}"),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compression {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Compression::None),
            "zlib" => Ok(Compression::Zlib),
            "zstd" => Ok(Compression::Zstd),
            other => bail!("unknown compression method {other:?} (expected none, zlib or zstd)"),
        }
    }
}

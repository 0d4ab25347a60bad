//! Pluggable record compression for the binary encoding.
//!
//! Every binary record payload is compressed independently, so a record can
//! be decompressed, rewritten and recompressed without touching its
//! neighbours. Each [`Compression`] method maps to one [`PressCodec`].
//!
//! ## Built-in Codecs
//!
//! - **none** - payload stored as-is (always available)
//! - **zlib** - via `flate2` (feature: `compression-zlib`)
//! - **zstd** - via `zstd` (feature: `compression-zstd`)
//!
//! Asking for a method whose feature is disabled is an error at lookup time,
//! before any record is touched.
//!
//! ```
//! use slow5merge::format::Compression;
//! use slow5merge::io::compression::codec_for;
//! # fn main() -> anyhow::Result<()> {
//! let codec = codec_for(Compression::None)?;
//! let packed = codec.compress(b"payload")?;
//! assert_eq!(codec.decompress(&packed)?, b"payload");
//! # Ok(())
//! # }
//! ```

use crate::format::Compression;
use anyhow::{Result, bail};

/// Record-level compression codec.
///
/// # Thread Safety
/// Codecs are shared by every worker of a run, so implementations must be
/// `Send + Sync` and hold no per-call state.
pub trait PressCodec: Send + Sync {
    /// Human-readable codec name (e.g., "zlib").
    fn name(&self) -> &str;

    /// The method this codec implements.
    fn method(&self) -> Compression;

    /// Compress one record payload.
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>>;

    /// Decompress one record payload.
    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>>;
}

/// Look up the codec for a compression method.
///
/// # Errors
/// Returns an error if the method was compiled out.
pub fn codec_for(method: Compression) -> Result<&'static dyn PressCodec> {
    match method {
        Compression::None => Ok(&NoneCodec),
        #[cfg(feature = "compression-zlib")]
        Compression::Zlib => Ok(&ZlibCodec),
        #[cfg(feature = "compression-zstd")]
        Compression::Zstd => Ok(&ZstdCodec),
        #[allow(unreachable_patterns)]
        other => bail!("compression method {other} is not enabled in this build"),
    }
}

// ============================================================================
// Built-in Codec Implementations
// ============================================================================

struct NoneCodec;

impl PressCodec for NoneCodec {
    fn name(&self) -> &str {
        "none"
    }

    fn method(&self) -> Compression {
        Compression::None
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

#[cfg(feature = "compression-zlib")]
struct ZlibCodec;

#[cfg(feature = "compression-zlib")]
impl PressCodec for ZlibCodec {
    fn name(&self) -> &str {
        "zlib"
    }

    fn method(&self) -> Compression {
        Compression::Zlib
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        use flate2::Compression as Level;
        use flate2::write::ZlibEncoder;
        use std::io::Write;
        let mut enc = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Level::default());
        enc.write_all(data)?;
        enc.finish()
    }

    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        use flate2::read::ZlibDecoder;
        use std::io::Read;
        let mut out = Vec::with_capacity(data.len() * 2);
        ZlibDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl PressCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn method(&self) -> Compression {
        Compression::Zstd
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        zstd::stream::encode_all(data, 3)
    }

    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        zstd::stream::decode_all(data)
    }
}

#![cfg(all(feature = "compression-zlib", feature = "compression-zstd"))]

use anyhow::Result;
use slow5merge::Compression;
use slow5merge::io::compression::codec_for;

fn payload() -> Vec<u8> {
    (0..4096u32).flat_map(|i| ((i % 300) as i16).to_le_bytes()).collect()
}

#[test]
fn every_method_restores_its_input() -> Result<()> {
    let data = payload();
    for method in [Compression::None, Compression::Zlib, Compression::Zstd] {
        let codec = codec_for(method)?;
        assert_eq!(codec.method(), method);
        assert_eq!(codec.name(), method.name());
        let packed = codec.compress(&data)?;
        assert_eq!(codec.decompress(&packed)?, data, "{method}");
    }
    Ok(())
}

#[test]
fn real_codecs_shrink_repetitive_signal() -> Result<()> {
    let data = payload();
    for method in [Compression::Zlib, Compression::Zstd] {
        let packed = codec_for(method)?.compress(&data)?;
        assert!(packed.len() < data.len() / 2, "{method}: {}", packed.len());
    }
    Ok(())
}

#[test]
fn corrupt_payload_is_an_error() -> Result<()> {
    let garbage = b"\x00\x01\x02 not compressed at all";
    assert!(codec_for(Compression::Zlib)?.decompress(garbage).is_err());
    assert!(codec_for(Compression::Zstd)?.decompress(garbage).is_err());
    Ok(())
}

#[test]
fn method_names_parse_back() -> Result<()> {
    for method in [Compression::None, Compression::Zlib, Compression::Zstd] {
        assert_eq!(method.name().parse::<Compression>()?, method);
    }
    assert!("lz4".parse::<Compression>().is_err());
    Ok(())
}

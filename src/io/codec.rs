//! Record codec: raw bytes to [`Record`] and back.
//!
//! `decode` takes the undecoded bytes produced by a reader (one text line, or
//! one binary payload) and the context of the file they came from. `encode`
//! returns fully framed bytes, so the outputs of independent calls can be
//! concatenated straight into a stream.

use crate::format::{Compression, Encoding};
use crate::header::{ABSENT, AuxSpec, AuxType, Header, PRIMARY_NAMES};
use crate::io::compression::codec_for;
use crate::record::{AuxValue, Record};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Everything needed to decode a record from a particular file.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordContext {
    pub encoding: Encoding,
    pub compression: Compression,
    pub aux: Option<AuxSpec>,
}

impl RecordContext {
    #[must_use]
    pub fn of(header: &Header) -> Self {
        Self {
            encoding: header.encoding,
            compression: header.compression,
            aux: header.aux.clone(),
        }
    }
}

static MISSING: AuxValue = AuxValue::Missing;

#[derive(Serialize)]
struct BodyRef<'a> {
    read_id: &'a str,
    read_group: u32,
    digitisation: f64,
    offset: f64,
    range: f64,
    sampling_rate: f64,
    raw_signal: &'a [i16],
    aux: Vec<&'a AuxValue>,
}

#[derive(Deserialize)]
struct Body {
    read_id: String,
    read_group: u32,
    digitisation: f64,
    offset: f64,
    range: f64,
    sampling_rate: f64,
    raw_signal: Vec<i16>,
    aux: Vec<AuxValue>,
}

/// Decode one raw record.
///
/// # Errors
/// Returns an error if decompression fails or the bytes do not match the
/// layout described by `ctx`.
pub fn decode(raw: &[u8], ctx: &RecordContext) -> Result<Record> {
    match ctx.encoding {
        Encoding::Text => {
            let line = std::str::from_utf8(raw).context("record line is not UTF-8")?;
            decode_text(line, ctx.aux.as_ref())
        }
        Encoding::Binary => {
            let codec = codec_for(ctx.compression)?;
            let plain = codec
                .decompress(raw)
                .with_context(|| format!("decompress record with {}", codec.name()))?;
            let body: Body = postcard::from_bytes(&plain).context("parse binary record")?;
            let names = ctx.aux.as_ref().map(AuxSpec::fields).unwrap_or_default();
            ensure!(
                body.aux.len() == names.len(),
                "record {} carries {} auxiliary values for {} fields",
                body.read_id,
                body.aux.len(),
                names.len()
            );
            let aux = names
                .iter()
                .map(|f| f.name.clone())
                .zip(body.aux)
                .collect();
            Ok(Record {
                read_id: body.read_id,
                read_group: body.read_group,
                digitisation: body.digitisation,
                offset: body.offset,
                range: body.range,
                sampling_rate: body.sampling_rate,
                raw_signal: body.raw_signal,
                aux,
            })
        }
    }
}

/// Encode one record into framed bytes.
///
/// Auxiliary values are laid out in `aux` order; a field the record lacks is
/// written as missing. With `aux == None` no auxiliary data is written.
///
/// # Errors
/// Returns an error if the compression method is unavailable or fails.
pub fn encode(
    record: &Record,
    aux: Option<&AuxSpec>,
    encoding: Encoding,
    compression: Compression,
) -> Result<Vec<u8>> {
    let values: Vec<&AuxValue> = aux
        .map(AuxSpec::fields)
        .unwrap_or_default()
        .iter()
        .map(|f| record.aux.get(&f.name).unwrap_or(&MISSING))
        .collect();

    match encoding {
        Encoding::Text => Ok(encode_text(record, &values).into_bytes()),
        Encoding::Binary => {
            let body = BodyRef {
                read_id: &record.read_id,
                read_group: record.read_group,
                digitisation: record.digitisation,
                offset: record.offset,
                range: record.range,
                sampling_rate: record.sampling_rate,
                raw_signal: &record.raw_signal,
                aux: values,
            };
            let plain = postcard::to_allocvec(&body).context("serialize binary record")?;
            let codec = codec_for(compression)?;
            let payload = codec
                .compress(&plain)
                .with_context(|| format!("compress record with {}", codec.name()))?;
            let mut framed = Vec::with_capacity(8 + payload.len());
            framed.extend_from_slice(&(payload.len() as u64).to_le_bytes());
            framed.extend_from_slice(&payload);
            Ok(framed)
        }
    }
}

fn encode_text(record: &Record, aux: &[&AuxValue]) -> String {
    let mut line = String::with_capacity(64 + record.raw_signal.len() * 4);
    let _ = write!(
        line,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t",
        record.read_id,
        record.read_group,
        record.digitisation,
        record.offset,
        record.range,
        record.sampling_rate,
        record.raw_signal.len()
    );
    for (i, s) in record.raw_signal.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        let _ = write!(line, "{s}");
    }
    for value in aux {
        let _ = write!(line, "\t{value}");
    }
    line.push('\n');
    line
}

fn decode_text(line: &str, aux: Option<&AuxSpec>) -> Result<Record> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let cols: Vec<&str> = line.split('\t').collect();
    let fields = aux.map(AuxSpec::fields).unwrap_or_default();
    ensure!(
        cols.len() == PRIMARY_NAMES.len() + fields.len(),
        "record has {} columns, header declares {}",
        cols.len(),
        PRIMARY_NAMES.len() + fields.len()
    );

    let read_id = cols[0].to_string();
    let column = |i: usize| -> Result<f64> {
        cols[i]
            .parse()
            .with_context(|| format!("{} of {read_id}", PRIMARY_NAMES[i]))
    };
    let read_group: u32 = cols[1]
        .parse()
        .with_context(|| format!("read_group of {read_id}"))?;
    let declared: usize = cols[6]
        .parse()
        .with_context(|| format!("len_raw_signal of {read_id}"))?;
    let raw_signal = if cols[7].is_empty() {
        Vec::new()
    } else {
        cols[7]
            .split(',')
            .map(str::parse::<i16>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("raw_signal of {read_id}"))?
    };
    ensure!(
        raw_signal.len() == declared,
        "{read_id}: len_raw_signal is {declared} but {} samples present",
        raw_signal.len()
    );

    let mut values = BTreeMap::new();
    for (field, text) in fields.iter().zip(&cols[PRIMARY_NAMES.len()..]) {
        let value = parse_aux(field.ty, text)
            .with_context(|| format!("auxiliary field {} of {read_id}: {text:?}", field.name))?;
        values.insert(field.name.clone(), value);
    }

    Ok(Record {
        digitisation: column(2)?,
        offset: column(3)?,
        range: column(4)?,
        sampling_rate: column(5)?,
        read_id,
        read_group,
        raw_signal,
        aux: values,
    })
}

fn parse_aux(ty: AuxType, text: &str) -> Result<AuxValue> {
    if text == ABSENT {
        return Ok(AuxValue::Missing);
    }
    Ok(match ty {
        AuxType::Int32 | AuxType::Int64 => AuxValue::Int(text.parse()?),
        AuxType::UInt8 | AuxType::UInt32 | AuxType::UInt64 => AuxValue::UInt(text.parse()?),
        AuxType::Float | AuxType::Double => AuxValue::Float(text.parse()?),
        AuxType::Str => AuxValue::Str(text.to_string()),
    })
}

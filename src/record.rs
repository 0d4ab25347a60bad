//! In-memory record types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value of one auxiliary field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AuxValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Missing,
}

impl fmt::Display for AuxValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuxValue::Int(v) => write!(f, "{v}"),
            AuxValue::UInt(v) => write!(f, "{v}"),
            AuxValue::Float(v) => write!(f, "{v}"),
            AuxValue::Str(s) => f.write_str(s),
            AuxValue::Missing => f.write_str(crate::header::ABSENT),
        }
    }
}

/// One signal read.
///
/// `read_group` indexes the groups of whichever header the record was read
/// against; re-encoding rewrites it into the merged numbering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub read_id: String,
    pub read_group: u32,
    pub digitisation: f64,
    pub offset: f64,
    pub range: f64,
    pub sampling_rate: f64,
    pub raw_signal: Vec<i16>,
    pub aux: BTreeMap<String, AuxValue>,
}

/// Undecoded record bytes together with the input they came from.
///
/// For text files `bytes` is one line without its terminator; for binary
/// files it is one frame payload without the length prefix.
#[derive(Clone, Debug)]
pub struct RawRecord {
    pub bytes: Vec<u8>,
    pub file_index: usize,
}


//! Header model: read groups, auxiliary field schema and the header itself.
//!
//! A merged header is assembled in two phases. [`HeaderBuilder`] is mutated
//! while inputs are reconciled; [`HeaderBuilder::freeze`] consumes it into an
//! immutable [`Header`], which is the only form the parallel phase ever sees.

use crate::format::{Compression, Encoding, FORMAT_VERSION, Version};
use anyhow::{Context, Result, anyhow, bail, ensure};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::str::FromStr;

/// Attribute used to decide whether two read groups describe the same run.
pub const NATURAL_KEY: &str = "run_id";

/// Placeholder written for an attribute a read group does not define.
pub(crate) const ABSENT: &str = ".";

pub(crate) const PRIMARY_TYPES: [&str; 8] = [
    "char*", "uint32_t", "double", "double", "double", "double", "uint64_t", "int16_t*",
];

pub(crate) const PRIMARY_NAMES: [&str; 8] = [
    "read_id",
    "read_group",
    "digitisation",
    "offset",
    "range",
    "sampling_rate",
    "len_raw_signal",
    "raw_signal",
];

/// Metadata describing one sequencing run, referenced by records through
/// their `read_group` index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadGroup {
    attrs: BTreeMap<String, String>,
}

impl ReadGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a group from `(name, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            attrs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// The natural key of this group, if present.
    #[must_use]
    pub fn run_id(&self) -> Option<&str> {
        self.get(NATURAL_KEY)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Primitive type of an auxiliary record field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuxType {
    Int32,
    Int64,
    UInt8,
    UInt32,
    UInt64,
    Float,
    Double,
    Str,
}

impl AuxType {
    #[must_use]
    pub fn c_name(self) -> &'static str {
        match self {
            AuxType::Int32 => "int32_t",
            AuxType::Int64 => "int64_t",
            AuxType::UInt8 => "uint8_t",
            AuxType::UInt32 => "uint32_t",
            AuxType::UInt64 => "uint64_t",
            AuxType::Float => "float",
            AuxType::Double => "double",
            AuxType::Str => "char*",
        }
    }
}

impl FromStr for AuxType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "int32_t" => AuxType::Int32,
            "int64_t" => AuxType::Int64,
            "uint8_t" => AuxType::UInt8,
            "uint32_t" => AuxType::UInt32,
            "uint64_t" => AuxType::UInt64,
            "float" => AuxType::Float,
            "double" => AuxType::Double,
            "char*" => AuxType::Str,
            other => bail!("unsupported auxiliary field type {other:?}"),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxField {
    pub name: String,
    pub ty: AuxType,
}

impl AuxField {
    pub fn new(name: impl Into<String>, ty: AuxType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered auxiliary field schema of a file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxSpec {
    fields: Vec<AuxField>,
}

impl AuxSpec {
    #[must_use]
    pub fn new(fields: Vec<AuxField>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &[AuxField] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AuxField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First field of `other` whose name is known here with a different
    /// type, as `(known, other)`.
    #[must_use]
    pub fn conflict<'a>(&'a self, other: &'a AuxSpec) -> Option<(&'a AuxField, &'a AuxField)> {
        other
            .fields
            .iter()
            .find_map(|f| self.get(&f.name).filter(|k| k.ty != f.ty).map(|k| (k, f)))
    }

    /// Append every field of `other` whose name is not yet known. Known
    /// names are left untouched, so check [`Self::conflict`] first.
    pub fn extend_from(&mut self, other: &AuxSpec) {
        for field in &other.fields {
            if self.get(&field.name).is_none() {
                self.fields.push(field.clone());
            }
        }
    }
}

/// Parsed or assembled file header.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub version: Version,
    pub encoding: Encoding,
    pub compression: Compression,
    pub groups: Vec<ReadGroup>,
    pub aux: Option<AuxSpec>,
}

impl Header {
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Render the tab separated header block, including the trailing column
    /// line. The binary encoding embeds the same text.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "#slow5_version\t{}", self.version);
        let _ = writeln!(out, "#num_read_groups\t{}", self.groups.len());

        let names: BTreeSet<&str> = self
            .groups
            .iter()
            .flat_map(|g| g.attrs.keys().map(String::as_str))
            .collect();
        for name in names {
            out.push('@');
            out.push_str(name);
            for group in &self.groups {
                out.push('\t');
                out.push_str(group.get(name).unwrap_or(ABSENT));
            }
            out.push('\n');
        }

        out.push('#');
        out.push_str(&PRIMARY_TYPES.join("\t"));
        if let Some(aux) = &self.aux {
            for field in aux.fields() {
                out.push('\t');
                out.push_str(field.ty.c_name());
            }
        }
        out.push('\n');

        out.push('#');
        out.push_str(&PRIMARY_NAMES.join("\t"));
        if let Some(aux) = &self.aux {
            for field in aux.fields() {
                out.push('\t');
                out.push_str(&field.name);
            }
        }
        out.push('\n');
        out
    }

    /// Parse header text produced by [`Header::render_text`].
    ///
    /// `lines` must not include line terminators. Encoding and compression
    /// are properties of the container, so the caller supplies them.
    pub fn parse_text<S: AsRef<str>>(
        lines: &[S],
        encoding: Encoding,
        compression: Compression,
    ) -> Result<Self> {
        let mut it = lines.iter().map(AsRef::as_ref);

        let version = it
            .next()
            .and_then(|l| l.strip_prefix("#slow5_version\t"))
            .ok_or_else(|| anyhow!("missing #slow5_version line"))?
            .parse::<Version>()?;
        let count: usize = it
            .next()
            .and_then(|l| l.strip_prefix("#num_read_groups\t"))
            .ok_or_else(|| anyhow!("missing #num_read_groups line"))?
            .trim()
            .parse()
            .context("parse #num_read_groups")?;

        let mut groups = vec![ReadGroup::new(); count];
        let mut line = it.next();
        while let Some(attr_line) = line.and_then(|l| l.strip_prefix('@')) {
            let mut cols = attr_line.split('\t');
            let name = cols.next().unwrap_or_default();
            let values: Vec<&str> = cols.collect();
            ensure!(
                values.len() == count,
                "attribute @{name} has {} values for {count} read groups",
                values.len()
            );
            for (group, value) in groups.iter_mut().zip(values) {
                if value != ABSENT {
                    group.insert(name, value);
                }
            }
            line = it.next();
        }

        let types: Vec<&str> = line
            .and_then(|l| l.strip_prefix('#'))
            .ok_or_else(|| anyhow!("missing column type line"))?
            .split('\t')
            .collect();
        let names: Vec<&str> = it
            .next()
            .and_then(|l| l.strip_prefix('#'))
            .ok_or_else(|| anyhow!("missing column name line"))?
            .split('\t')
            .collect();
        ensure!(
            types.len() >= PRIMARY_TYPES.len() && types[..PRIMARY_TYPES.len()] == PRIMARY_TYPES,
            "unexpected primary column types"
        );
        ensure!(
            names.len() >= PRIMARY_NAMES.len() && names[..PRIMARY_NAMES.len()] == PRIMARY_NAMES,
            "unexpected primary column names"
        );
        ensure!(
            types.len() == names.len(),
            "{} column types for {} column names",
            types.len(),
            names.len()
        );

        let aux_fields = types[PRIMARY_TYPES.len()..]
            .iter()
            .zip(&names[PRIMARY_NAMES.len()..])
            .map(|(ty, name)| Ok(AuxField::new(*name, ty.parse()?)))
            .collect::<Result<Vec<_>>>()?;
        let aux = (!aux_fields.is_empty()).then(|| AuxSpec::new(aux_fields));

        Ok(Header {
            version,
            encoding,
            compression,
            groups,
            aux,
        })
    }
}

/// Mutable header under construction during reconciliation.
#[derive(Debug)]
pub struct HeaderBuilder {
    encoding: Encoding,
    compression: Compression,
    groups: Vec<ReadGroup>,
    by_key: HashMap<String, u32>,
    aux: Option<AuxSpec>,
}

impl HeaderBuilder {
    /// Start an empty header. `lossless` decides whether an auxiliary schema
    /// is carried at all.
    #[must_use]
    pub fn new(encoding: Encoding, compression: Compression, lossless: bool) -> Self {
        Self {
            encoding,
            compression,
            groups: Vec::new(),
            by_key: HashMap::new(),
            aux: lossless.then(AuxSpec::default),
        }
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Global index of the group whose natural key matches `group`, adding
    /// `group` as a new global group when none does.
    ///
    /// Only the natural key is compared. A later group with a known run id
    /// is assumed to agree with the first one on every other attribute.
    pub fn intern(&mut self, group: &ReadGroup) -> Result<u32> {
        let key = group
            .run_id()
            .ok_or_else(|| anyhow!("read group has no {NATURAL_KEY} attribute"))?;
        if let Some(&idx) = self.by_key.get(key) {
            return Ok(idx);
        }
        let idx = u32::try_from(self.groups.len()).context("too many read groups")?;
        self.by_key.insert(key.to_string(), idx);
        self.groups.push(group.clone());
        Ok(idx)
    }

    /// Field of `aux` whose type disagrees with the merged schema so far.
    /// Always `None` for a lossy header.
    #[must_use]
    pub fn aux_conflict<'a>(&'a self, aux: &'a AuxSpec) -> Option<(&'a AuxField, &'a AuxField)> {
        self.aux.as_ref()?.conflict(aux)
    }

    /// Fold an input's auxiliary schema into the merged one. No-op for a
    /// lossy header.
    pub fn merge_aux(&mut self, aux: &AuxSpec) {
        if let Some(merged) = self.aux.as_mut() {
            merged.extend_from(aux);
        }
    }

    /// Finish reconciliation; the result is never mutated again.
    #[must_use]
    pub fn freeze(self) -> Header {
        Header {
            version: FORMAT_VERSION,
            encoding: self.encoding,
            compression: self.compression,
            groups: self.groups,
            aux: self.aux,
        }
    }
}

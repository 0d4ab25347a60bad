//! Read group reconciliation across inputs.

use anyhow::Result;
use slow5merge::testing::*;
use slow5merge::{
    AuxField, AuxSpec, AuxType, AuxValue, Compression, Encoding, MergeError, ReadGroup, Record,
    reconcile,
};
use std::fs;
use std::path::PathBuf;

fn two_records(builder: InputFileBuilder, prefix: &str, group: u32) -> InputFileBuilder {
    builder
        .record(sample_record(&format!("{prefix}-1"), group))
        .record(sample_record(&format!("{prefix}-2"), group))
}

fn with_x(id: &str, value: AuxValue) -> Record {
    let mut record = sample_record(id, 0);
    record.aux.insert("x".to_string(), value);
    record
}

#[test]
fn shared_run_id_collapses_to_one_group() -> Result<()> {
    let dir = scratch_dir()?;
    let a = two_records(
        InputFileBuilder::new(Encoding::Binary)
            .group("X")
            .aux(sample_aux_spec()),
        "a",
        0,
    )
    .write(dir.path().join("a.blow5"))?;
    let b = two_records(
        InputFileBuilder::new(Encoding::Text)
            .group("X")
            .group("Y")
            .aux(sample_aux_spec()),
        "b",
        1,
    )
    .write(dir.path().join("b.slow5"))?;

    let rec = reconcile(&[a, b], Encoding::Binary, Compression::Zlib, true)?;

    assert_eq!(run_ids(&rec.header), ["X", "Y"]);
    let tables: Vec<&[u32]> = rec.tables().map(|t| t.as_slice()).collect();
    assert_eq!(tables, [&[0][..], &[0, 1][..]]);
    assert!(rec.skipped.is_empty());
    Ok(())
}

#[test]
fn translation_follows_first_appearance_not_local_order() -> Result<()> {
    let dir = scratch_dir()?;
    let a = two_records(InputFileBuilder::new(Encoding::Binary).group("X"), "a", 0)
        .write(dir.path().join("a.blow5"))?;
    let b = two_records(
        InputFileBuilder::new(Encoding::Binary).group("Y").group("X").group("Z"),
        "b",
        2,
    )
    .write(dir.path().join("b.blow5"))?;

    let rec = reconcile(&[a, b], Encoding::Binary, Compression::Zlib, false)?;

    assert_eq!(run_ids(&rec.header), ["X", "Y", "Z"]);
    assert_eq!(rec.sources[1].table.as_slice(), &[1, 0, 2]);
    assert_eq!(rec.sources[1].table.translate(2)?, 2);
    assert!(rec.sources[1].table.translate(3).is_err());
    Ok(())
}

#[test]
fn first_group_definition_wins() -> Result<()> {
    let dir = scratch_dir()?;
    let a = InputFileBuilder::new(Encoding::Binary)
        .read_group(ReadGroup::from_pairs([("run_id", "X"), ("flowcell", "first")]))
        .record(sample_record("a-1", 0))
        .write(dir.path().join("a.blow5"))?;
    let b = InputFileBuilder::new(Encoding::Binary)
        .read_group(ReadGroup::from_pairs([("run_id", "X"), ("flowcell", "second")]))
        .record(sample_record("b-1", 0))
        .write(dir.path().join("b.blow5"))?;

    let rec = reconcile(&[a, b], Encoding::Binary, Compression::Zlib, false)?;

    assert_eq!(rec.header.group_count(), 1);
    assert_eq!(rec.header.groups[0].get("flowcell"), Some("first"));
    Ok(())
}

#[test]
fn unusable_inputs_are_skipped_without_side_effects() -> Result<()> {
    let dir = scratch_dir()?;
    let garbage = dir.path().join("garbage.blow5");
    fs::write(&garbage, b"definitely not a blow5 file")?;
    let missing = dir.path().join("missing.slow5");
    let no_records = InputFileBuilder::new(Encoding::Binary)
        .group("EMPTY")
        .write(dir.path().join("empty.blow5"))?;
    let no_groups = InputFileBuilder::new(Encoding::Text)
        .write(dir.path().join("nogroups.slow5"))?;
    let no_run_id = InputFileBuilder::new(Encoding::Binary)
        .read_group(ReadGroup::from_pairs([("asic_id", "123")]))
        .record(sample_record("n-1", 0))
        .write(dir.path().join("norunid.blow5"))?;
    let good = two_records(InputFileBuilder::new(Encoding::Binary).group("G"), "g", 0)
        .write(dir.path().join("good.blow5"))?;

    let files = vec![garbage, missing, no_records, no_groups, no_run_id, good.clone()];
    let rec = reconcile(&files, Encoding::Binary, Compression::Zlib, false)?;

    assert_eq!(rec.sources.len(), 1);
    assert_eq!(rec.sources[0].path, good);
    assert_eq!(rec.sources[0].table.as_slice(), &[0]);
    assert_eq!(run_ids(&rec.header), ["G"]);
    let skipped: Vec<&PathBuf> = rec.skipped.iter().map(|s| &s.path).collect();
    assert_eq!(skipped, files[..5].iter().collect::<Vec<_>>());
    assert!(rec.skipped.iter().all(|s| !s.reason.is_empty()));
    Ok(())
}

#[test]
fn lossless_requires_auxiliary_fields() -> Result<()> {
    let dir = scratch_dir()?;
    let with_aux = two_records(
        InputFileBuilder::new(Encoding::Binary)
            .group("A")
            .aux(sample_aux_spec()),
        "a",
        0,
    )
    .write(dir.path().join("a.blow5"))?;
    let without_aux = two_records(InputFileBuilder::new(Encoding::Binary).group("B"), "b", 0)
        .write(dir.path().join("b.blow5"))?;
    let files = [with_aux, without_aux.clone()];

    let err = reconcile(&files, Encoding::Binary, Compression::Zlib, true).unwrap_err();
    match err {
        MergeError::LosslessPrecondition { path } => assert_eq!(path, without_aux),
        other => panic!("unexpected error: {other}"),
    }

    let rec = reconcile(&files, Encoding::Binary, Compression::Zlib, false)?;
    assert_eq!(rec.sources.len(), 2);
    assert!(rec.header.aux.is_none());
    Ok(())
}

#[test]
fn lossless_schema_is_the_union_of_inputs() -> Result<()> {
    let dir = scratch_dir()?;
    let a = InputFileBuilder::new(Encoding::Text)
        .group("A")
        .aux(AuxSpec::new(vec![AuxField::new("read_number", AuxType::Int32)]))
        .record(sample_record("a-1", 0))
        .write(dir.path().join("a.slow5"))?;
    let b = InputFileBuilder::new(Encoding::Text)
        .group("B")
        .aux(AuxSpec::new(vec![
            AuxField::new("read_number", AuxType::Int32),
            AuxField::new("end_reason", AuxType::Str),
        ]))
        .record(sample_record("b-1", 0))
        .write(dir.path().join("b.slow5"))?;

    let rec = reconcile(&[a, b], Encoding::Text, Compression::None, true)?;

    let aux = rec.header.aux.expect("lossless header carries a schema");
    assert_eq!(
        aux.fields(),
        &[
            AuxField::new("read_number", AuxType::Int32),
            AuxField::new("end_reason", AuxType::Str),
        ]
    );
    Ok(())
}

#[test]
fn lossless_aux_type_clash_is_fatal() -> Result<()> {
    let dir = scratch_dir()?;
    let a = InputFileBuilder::new(Encoding::Text)
        .group("A")
        .aux(AuxSpec::new(vec![AuxField::new("x", AuxType::Int32)]))
        .record(with_x("a-1", AuxValue::Int(5)))
        .write(dir.path().join("a.slow5"))?;
    let b = InputFileBuilder::new(Encoding::Text)
        .group("B")
        .aux(AuxSpec::new(vec![AuxField::new("x", AuxType::Str)]))
        .record(with_x("b-1", AuxValue::Str("abc".into())))
        .write(dir.path().join("b.slow5"))?;
    let files = [a, b.clone()];

    let err = reconcile(&files, Encoding::Text, Compression::None, true).unwrap_err();
    assert_eq!(err.kind(), "precondition");
    match err {
        MergeError::AuxTypeConflict {
            path,
            field,
            merged,
            found,
        } => {
            assert_eq!(path, b);
            assert_eq!(field, "x");
            assert_eq!(merged, AuxType::Int32);
            assert_eq!(found, AuxType::Str);
        }
        other => panic!("unexpected error: {other}"),
    }

    let rec = reconcile(&files, Encoding::Text, Compression::None, false)?;
    assert_eq!(rec.sources.len(), 2);
    Ok(())
}

#[test]
fn corrupt_record_length_skips_the_input() -> Result<()> {
    let dir = scratch_dir()?;
    let good = two_records(InputFileBuilder::new(Encoding::Binary).group("G"), "g", 0)
        .write(dir.path().join("good.blow5"))?;
    let bad = InputFileBuilder::new(Encoding::Binary)
        .group("H")
        .without_eof_marker()
        .write(dir.path().join("bad.blow5"))?;
    let mut bytes = fs::read(&bad)?;
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    fs::write(&bad, bytes)?;

    let rec = reconcile(
        &[bad.clone(), good.clone()],
        Encoding::Binary,
        Compression::Zlib,
        false,
    )?;

    assert_eq!(rec.sources.len(), 1);
    assert_eq!(rec.sources[0].path, good);
    assert_eq!(rec.skipped.len(), 1);
    assert_eq!(rec.skipped[0].path, bad);
    assert_eq!(run_ids(&rec.header), ["G"]);
    Ok(())
}

#[test]
fn empty_file_list_reconciles_to_nothing() -> Result<()> {
    let rec = reconcile(&[], Encoding::Binary, Compression::Zlib, true)?;
    assert!(rec.is_empty());
    assert_eq!(rec.header.group_count(), 0);
    assert!(rec.skipped.is_empty());
    Ok(())
}

#[test]
fn merged_header_takes_the_target_format() -> Result<()> {
    let dir = scratch_dir()?;
    let a = InputFileBuilder::new(Encoding::Text)
        .group("A")
        .record(sample_record("a-1", 0))
        .write(dir.path().join("a.slow5"))?;

    let rec = reconcile(&[a], Encoding::Binary, Compression::Zstd, false)?;

    assert_eq!(rec.header.encoding, Encoding::Binary);
    assert_eq!(rec.header.compression, Compression::Zstd);
    assert_eq!(rec.sources[0].ctx.encoding, Encoding::Text);
    Ok(())
}

use anyhow::Result;
use slow5merge::metrics::{MetricsCollector, READ_GROUPS};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn counters_and_phases_accumulate() {
    let mut m = MetricsCollector::new();
    m.increment_counter("batches", 2);
    m.increment_counter("batches", 3);
    m.set_counter(READ_GROUPS, 7);
    m.add_phase("encode", Duration::from_millis(5));
    m.add_phase("encode", Duration::from_millis(7));

    assert_eq!(m.counter("batches"), Some(5));
    assert_eq!(m.counter(READ_GROUPS), Some(7));
    assert_eq!(m.counter("missing"), None);
    assert_eq!(m.phase("encode"), Some(Duration::from_millis(12)));
    assert!(m.elapsed().is_none());
}

#[test]
fn saves_json_report() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("metrics.json");

    let mut m = MetricsCollector::new();
    m.record_start();
    m.time_phase("reconcile", || std::thread::sleep(Duration::from_millis(2)));
    m.set_counter(READ_GROUPS, 3);
    m.record_end();
    m.save_to_file(&path)?;

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(json["counters"][READ_GROUPS], 3);
    assert!(json["phases_secs"]["reconcile"].as_f64().unwrap_or_default() > 0.0);
    assert!(json["execution_time_secs"].is_number());
    Ok(())
}

//! Run statistics: counters and per-phase wall-clock timings.
//!
//! Only the orchestrating thread records metrics, so the collector is a
//! plain value rather than a shared handle. It is returned inside
//! [`crate::runner::MergeSummary`] and can be printed or saved as JSON.
//!
//! ```
//! use slow5merge::metrics::MetricsCollector;
//!
//! let mut m = MetricsCollector::new();
//! m.record_start();
//! let n = m.time_phase("reconcile", || 3);
//! m.set_counter("read_groups", n);
//! m.record_end();
//! assert_eq!(m.counter("read_groups"), Some(3));
//! assert!(m.phase("reconcile").is_some());
//! ```

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

pub const FILES_FOUND: &str = "files_found";
pub const FILES_MERGED: &str = "files_merged";
pub const FILES_SKIPPED: &str = "files_skipped";
pub const READ_GROUPS: &str = "read_groups";
pub const RECORDS_WRITTEN: &str = "records_written";
pub const BYTES_WRITTEN: &str = "bytes_written";
pub const BATCHES: &str = "batches";

#[derive(Clone, Debug, Default)]
pub struct MetricsCollector {
    counters: BTreeMap<String, u64>,
    // Insertion order is kept so reports read in execution order.
    phases: Vec<(String, Duration)>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn record_end(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Time between [`Self::record_start`] and [`Self::record_end`].
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    pub fn increment_counter(&mut self, name: &str, value: u64) {
        *self.counters.entry(name.to_string()).or_insert(0) += value;
    }

    pub fn set_counter(&mut self, name: &str, value: u64) {
        self.counters.insert(name.to_string(), value);
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    /// Add `elapsed` to phase `name`, creating it on first use.
    pub fn add_phase(&mut self, name: &str, elapsed: Duration) {
        match self.phases.iter_mut().find(|(n, _)| n == name) {
            Some((_, total)) => *total += elapsed,
            None => self.phases.push((name.to_string(), elapsed)),
        }
    }

    /// Run `f`, charging its wall-clock time to phase `name`.
    pub fn time_phase<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.add_phase(name, start.elapsed());
        out
    }

    #[must_use]
    pub fn phase(&self, name: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| *d)
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let phases: Map<String, Value> = self
            .phases
            .iter()
            .map(|(name, d)| (name.clone(), json!(d.as_secs_f64())))
            .collect();
        let mut out = json!({
            "counters": self.counters,
            "phases_secs": phases,
        });
        if let Some(elapsed) = self.elapsed() {
            out["execution_time_secs"] = json!(elapsed.as_secs_f64());
        }
        out
    }

    /// Print a human-readable report to stderr. Stdout may carry the merged
    /// stream, so it is never used here.
    pub fn print(&self) {
        eprintln!("========== Merge Metrics ==========");
        if let Some(elapsed) = self.elapsed() {
            eprintln!("Execution Time: {:.3}s", elapsed.as_secs_f64());
            eprintln!("-----------------------------------");
        }
        for (name, d) in &self.phases {
            eprintln!("{name}: {:.3}s", d.as_secs_f64());
        }
        for (name, value) in &self.counters {
            eprintln!("{name}: {value}");
        }
        eprintln!("===================================");
    }

    /// Save all metrics to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(formatted.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

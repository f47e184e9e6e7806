//! Metric extraction over a replayed history.
//!
//! Every chartable value is a per-interval delta of a cumulative kernel
//! counter, computed between consecutive snapshots. A value is only produced
//! when the counter parses in both snapshots, so the first snapshot of any
//! counter never yields a point and gaps stay gaps.
//!
//! Counter regressions are not filtered: a reset shows up as a negative delta.

mod process;
mod system;
mod yaffs;

use std::collections::BTreeMap;

use tracing::debug;

use crate::replay::History;

pub use process::ProcessRecord;
pub use system::CpuMetrics;
pub use yaffs::PartitionRecord;

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// A `numerator / denominator` sample, rendered as a stacked fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    pub numerator: i64,
    pub denominator: i64,
}

impl Fraction {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

/// Time-ordered samples of one derived metric. Timestamps are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Series<V> {
    points: Vec<(f64, V)>,
}

impl<V> Default for Series<V> {
    fn default() -> Self {
        Self { points: Vec::new() }
    }
}

impl<V> Series<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample. Samples must arrive in increasing time order.
    pub fn push(&mut self, timestamp: f64, value: V) {
        debug_assert!(
            self.points.last().is_none_or(|(t, _)| *t < timestamp),
            "series samples out of order"
        );
        self.points.push((timestamp, value));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &V)> {
        self.points.iter().map(|(t, v)| (*t, v))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.points.iter().map(|(_, v)| v)
    }

    pub fn get(&self, timestamp: f64) -> Option<&V> {
        self.points
            .binary_search_by(|(t, _)| t.total_cmp(&timestamp))
            .ok()
            .map(|idx| &self.points[idx].1)
    }

    /// Stores a sample, replacing the last one when it has the same timestamp.
    pub fn set(&mut self, timestamp: f64, value: V) {
        match self.points.last_mut() {
            Some((t, v)) if *t == timestamp => *v = value,
            _ => self.push(timestamp, value),
        }
    }

    /// Derives a series sample by sample.
    pub fn map<W>(&self, f: impl Fn(&V) -> W) -> Series<W> {
        Series {
            points: self.points.iter().map(|(t, v)| (*t, f(v))).collect(),
        }
    }
}

impl Series<i64> {
    pub fn total(&self) -> i64 {
        self.values().sum()
    }

    pub fn max(&self) -> Option<i64> {
        self.values().copied().max()
    }
}

impl Series<Fraction> {
    /// Sum of numerators.
    pub fn total(&self) -> i64 {
        self.values().map(|f| f.numerator).sum()
    }
}

/// Difference of two raw counter readings. Regressions pass through.
pub fn delta(curr: i64, prev: i64) -> i64 {
    curr - prev
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Everything derived from one history.
#[derive(Debug, Default)]
pub struct Metrics {
    pub cpu: CpuMetrics,
    pub context_switches: Series<i64>,
    /// Major faults summed over all processes, per interval.
    pub total_faults: Series<i64>,
    pub processes: BTreeMap<u32, ProcessRecord>,
    pub partitions: BTreeMap<String, PartitionRecord>,
}

impl Metrics {
    /// Largest per-interval total fault count (0 when there is none).
    pub fn max_faults(&self) -> i64 {
        self.total_faults.max().unwrap_or(0).max(0)
    }
}

/// Walks the history once per key family and derives all metrics.
pub fn extract(history: &History) -> Metrics {
    let cpu = system::extract_cpu(history);
    let context_switches = system::extract_context_switches(history);
    let (processes, total_faults) = process::extract_processes(history, &cpu);
    let partitions = yaffs::extract_partitions(history);

    debug!(
        "extracted {} cpu intervals, {} processes, {} partitions",
        cpu.intervals.len(),
        processes.len(),
        partitions.len()
    );

    Metrics {
        cpu,
        context_switches,
        total_faults,
        processes,
        partitions,
    }
}

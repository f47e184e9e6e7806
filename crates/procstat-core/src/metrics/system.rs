//! System-wide counters from `/proc/stat`.

use tracing::trace;

use crate::parser::{CPU_KEY, CTXT_KEY, CpuTimes, parse_counter, parse_cpu_times};
use crate::replay::{History, Snapshot};

use super::{Fraction, Series, delta};

/// Per-interval CPU jiffies, split into sys / user / idle.
#[derive(Debug, Default)]
pub struct CpuMetrics {
    pub intervals: Series<CpuTimes>,
}

impl CpuMetrics {
    /// System time as a fraction of all jiffies.
    pub fn sys(&self) -> Series<Fraction> {
        self.intervals.map(|d| Fraction::new(d.sys, d.total()))
    }

    /// System + user time as a fraction of all jiffies.
    pub fn sys_user(&self) -> Series<Fraction> {
        self.intervals
            .map(|d| Fraction::new(d.sys + d.user, d.total()))
    }

    /// All jiffies elapsed in the interval ending at `timestamp`.
    pub fn all_at(&self, timestamp: f64) -> Option<i64> {
        self.intervals.get(timestamp).map(CpuTimes::total)
    }

    pub fn total_sys(&self) -> i64 {
        self.intervals.values().map(|d| d.sys).sum()
    }

    pub fn total_user(&self) -> i64 {
        self.intervals.values().map(|d| d.user).sum()
    }
}

fn cpu_times(snapshot: &Snapshot) -> Option<CpuTimes> {
    let value = snapshot.get(CPU_KEY)?;
    parse_cpu_times(value)
        .inspect_err(|e| trace!("{} at {}: {}", CPU_KEY, snapshot.timestamp, e))
        .ok()
}

fn counter(snapshot: &Snapshot, key: &str) -> Option<i64> {
    let value = snapshot.get(key)?;
    parse_counter(value)
        .inspect_err(|e| trace!("{} at {}: {}", key, snapshot.timestamp, e))
        .ok()
}

pub(super) fn extract_cpu(history: &History) -> CpuMetrics {
    let mut intervals = Series::new();
    for (prev, curr) in history.pairs() {
        let (Some(last), Some(next)) = (cpu_times(prev), cpu_times(curr)) else {
            continue;
        };
        intervals.push(
            curr.timestamp,
            CpuTimes {
                user: delta(next.user, last.user),
                sys: delta(next.sys, last.sys),
                idle: delta(next.idle, last.idle),
            },
        );
    }
    CpuMetrics { intervals }
}

pub(super) fn extract_context_switches(history: &History) -> Series<i64> {
    let mut switches = Series::new();
    for (prev, curr) in history.pairs() {
        if let (Some(last), Some(next)) = (counter(prev, CTXT_KEY), counter(curr, CTXT_KEY)) {
            switches.push(curr.timestamp, delta(next, last));
        }
    }
    switches
}

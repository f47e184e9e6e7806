//! Chooses which per-process and per-partition charts make the report.
//!
//! Busy logs contain hundreds of short-lived processes. Only those that used
//! a noticeable share of the CPU get a chart.

use crate::metrics::{Metrics, PartitionRecord, ProcessRecord};

/// Default divisor of the total CPU jiffies giving the process cutoff.
pub const DEFAULT_CPU_CUTOFF_DIVISOR: i64 = 1000;

/// Default divisor of the total major faults giving the fault cutoff.
pub const DEFAULT_FAULT_CUTOFF_DIVISOR: i64 = 200;

/// Selection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionConfig {
    pub cpu_cutoff_divisor: i64,
    pub fault_cutoff_divisor: i64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            cpu_cutoff_divisor: DEFAULT_CPU_CUTOFF_DIVISOR,
            fault_cutoff_divisor: DEFAULT_FAULT_CUTOFF_DIVISOR,
        }
    }
}

/// A process chosen for the report.
#[derive(Debug, Clone, Copy)]
pub struct SelectedProcess<'a> {
    pub record: &'a ProcessRecord,
    /// Whether its faults chart is shown too.
    pub show_faults: bool,
}

/// A partition chosen for the report.
#[derive(Debug, Clone, Copy)]
pub struct SelectedPartition<'a> {
    /// Position in the full name-sorted partition list, skipped ones included.
    pub index: usize,
    pub record: &'a PartitionRecord,
}

/// The charts that make it into the report, in display order.
#[derive(Debug)]
pub struct Selection<'a> {
    pub cpu_cutoff: i64,
    pub fault_cutoff: i64,
    pub processes: Vec<SelectedProcess<'a>>,
    pub partitions: Vec<SelectedPartition<'a>>,
}

/// Integer division by a configured divisor; a zero divisor disables the cutoff.
fn cutoff(total: i64, divisor: i64) -> i64 {
    if divisor == 0 {
        return i64::MIN;
    }
    total / divisor
}

pub fn select<'a>(metrics: &'a Metrics, config: &SelectionConfig) -> Selection<'a> {
    let cpu_cutoff = cutoff(
        metrics.cpu.total_sys() + metrics.cpu.total_user(),
        config.cpu_cutoff_divisor,
    );
    let fault_cutoff = cutoff(metrics.total_faults.total(), config.fault_cutoff_divisor);

    let mut by_start: Vec<&ProcessRecord> = metrics.processes.values().collect();
    by_start.sort_by(|a, b| {
        a.first_seen
            .total_cmp(&b.first_seen)
            .then(a.pid.cmp(&b.pid))
    });

    let processes = by_start
        .into_iter()
        .filter(|p| p.sys_user_total() > cpu_cutoff)
        .map(|record| SelectedProcess {
            record,
            show_faults: record.faults_total() > fault_cutoff,
        })
        .collect();

    let partitions = metrics
        .partitions
        .values()
        .enumerate()
        .filter(|(_, p)| p.totals().iter().sum::<i64>() != 0)
        .map(|(index, record)| SelectedPartition { index, record })
        .collect();

    Selection {
        cpu_cutoff,
        fault_cutoff,
        processes,
        partitions,
    }
}

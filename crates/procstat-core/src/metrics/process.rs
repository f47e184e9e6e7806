//! Per-process CPU time and major faults from `/proc/[pid]/stat`.

use std::collections::BTreeMap;

use tracing::trace;

use crate::parser::{ProcStat, is_proc_stat_key, parse_proc_stat};
use crate::replay::History;

use super::{CpuMetrics, Fraction, Series, delta};

/// Everything accumulated for one pid over the whole log.
///
/// Pid reuse is not detected: a recycled pid continues the earlier record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    /// Timestamp of the first snapshot the process appeared in.
    pub first_seen: f64,
    /// Name from the most recent snapshot.
    pub name: String,
    /// stime as a fraction of all CPU jiffies.
    pub sys: Series<Fraction>,
    /// stime + utime as a fraction of all CPU jiffies.
    pub sys_user: Series<Fraction>,
    /// Major page faults.
    pub faults: Series<i64>,
}

impl ProcessRecord {
    fn new(pid: u32, first_seen: f64) -> Self {
        Self {
            pid,
            first_seen,
            name: String::new(),
            sys: Series::new(),
            sys_user: Series::new(),
            faults: Series::new(),
        }
    }

    pub fn sys_total(&self) -> i64 {
        self.sys.total()
    }

    pub fn sys_user_total(&self) -> i64 {
        self.sys_user.total()
    }

    pub fn user_total(&self) -> i64 {
        self.sys_user_total() - self.sys_total()
    }

    pub fn faults_total(&self) -> i64 {
        self.faults.total()
    }
}

/// Derives per-process series, normalized by the same-interval CPU total.
///
/// Intervals without a non-zero CPU total are skipped for every process
/// metric. Several `/stat` keys can name the same pid (e.g. a thread entry);
/// the last one in key order wins for that interval. Returns the records and
/// the per-interval fault sum over all processes.
pub(super) fn extract_processes(
    history: &History,
    cpu: &CpuMetrics,
) -> (BTreeMap<u32, ProcessRecord>, Series<i64>) {
    let mut processes: BTreeMap<u32, ProcessRecord> = BTreeMap::new();
    let mut total_faults = Series::new();

    for (idx, curr) in history.iter().enumerate() {
        let ts = curr.timestamp;
        let prev = idx.checked_sub(1).and_then(|i| history.get(i));
        let all = cpu.all_at(ts).filter(|&all| all != 0);
        let mut interval_faults: BTreeMap<u32, i64> = BTreeMap::new();

        for (key, value) in curr.iter().filter(|(key, _)| is_proc_stat_key(key)) {
            let next = match parse_proc_stat(value) {
                Ok(stat) => stat,
                Err(e) => {
                    trace!("{} at {}: {}", key, ts, e);
                    continue;
                }
            };

            let record = processes
                .entry(next.pid)
                .or_insert_with(|| ProcessRecord::new(next.pid, ts));
            record.name.clone_from(&next.comm);

            let Some(all) = all else {
                continue;
            };
            let Some(last) = prev
                .and_then(|p| p.get(key))
                .and_then(|v| parse_proc_stat(v).ok())
            else {
                continue;
            };

            let faults = record_interval(record, ts, &last, &next, all);
            interval_faults.insert(next.pid, faults);
        }

        if !interval_faults.is_empty() {
            total_faults.push(ts, interval_faults.values().sum());
        }
    }

    (processes, total_faults)
}

/// Records one interval for a process and returns its fault delta.
fn record_interval(
    record: &mut ProcessRecord,
    ts: f64,
    last: &ProcStat,
    next: &ProcStat,
    all: i64,
) -> i64 {
    let faults = delta(next.majflt, last.majflt);
    let stime = delta(next.stime, last.stime);
    let utime = delta(next.utime, last.utime);

    record.faults.set(ts, faults);
    record.sys.set(ts, Fraction::new(stime, all));
    record.sys_user.set(ts, Fraction::new(stime + utime, all));
    faults
}

#[cfg(test)]
mod tests {
    use super::super::system::extract_cpu;
    use super::super::tests::history_of;
    use super::*;
    use crate::parser::CPU_KEY;

    /// Stat line with majflt, utime and stime at their kernel positions.
    fn stat(pid: u32, comm: &str, majflt: i64, utime: i64, stime: i64) -> String {
        format!(
            "{} ({}) S 1 1 1 0 -1 0 0 0 {} 0 {} {} 0 0 20 0 1",
            pid, comm, majflt, utime, stime
        )
    }

    #[test]
    fn test_process_deltas_normalized_by_cpu() {
        let s0 = stat(42, "surfaceflinger", 10, 100, 50);
        let s1 = stat(42, "surfaceflinger", 13, 130, 60);
        let history = history_of(&[
            (
                0.0,
                1.0,
                &[(CPU_KEY, "0 0 0 0 0 0 0 0 0 0"), ("/proc/42/stat", s0.as_str())],
            ),
            (
                2.0,
                3.0,
                &[(CPU_KEY, "50 0 20 30 0 0 0 0 0 0"), ("/proc/42/stat", s1.as_str())],
            ),
        ]);
        let cpu = extract_cpu(&history);
        let (processes, total_faults) = extract_processes(&history, &cpu);

        let p = &processes[&42];
        assert_eq!(p.first_seen, 0.5);
        assert_eq!(p.name, "surfaceflinger");
        assert_eq!(p.sys.get(2.5), Some(&Fraction::new(10, 100)));
        assert_eq!(p.sys_user.get(2.5), Some(&Fraction::new(40, 100)));
        assert_eq!(p.faults.get(2.5), Some(&3));
        assert_eq!(p.sys_total(), 10);
        assert_eq!(p.user_total(), 30);
        assert_eq!(total_faults.get(2.5), Some(&3));
    }

    #[test]
    fn test_process_needs_previous_sample() {
        let late = stat(7, "late", 5, 5, 5);
        let history = history_of(&[
            (0.0, 0.0, &[(CPU_KEY, "0 0 0 0 0 0 0 0 0 0")]),
            (
                1.0,
                1.0,
                &[(CPU_KEY, "10 0 0 0 0 0 0 0 0 0"), ("/proc/7/stat", late.as_str())],
            ),
        ]);
        let cpu = extract_cpu(&history);
        let (processes, total_faults) = extract_processes(&history, &cpu);

        let p = &processes[&7];
        assert_eq!(p.first_seen, 1.0);
        assert!(p.faults.is_empty());
        assert!(p.sys.is_empty());
        assert!(total_faults.is_empty());
    }

    #[test]
    fn test_zero_cpu_interval_is_skipped() {
        let s0 = stat(1, "init", 0, 0, 0);
        let s1 = stat(1, "init", 4, 1, 1);
        let history = history_of(&[
            (
                0.0,
                0.0,
                &[(CPU_KEY, "5 5 5 5 5 5 5 0 0 0"), ("/proc/1/stat", s0.as_str())],
            ),
            (
                1.0,
                1.0,
                &[(CPU_KEY, "5 5 5 5 5 5 5 0 0 0"), ("/proc/1/stat", s1.as_str())],
            ),
        ]);
        let cpu = extract_cpu(&history);
        assert_eq!(cpu.all_at(1.0), Some(0));

        let (processes, total_faults) = extract_processes(&history, &cpu);
        assert!(processes[&1].faults.is_empty());
        assert!(total_faults.is_empty());
    }

    #[test]
    fn test_name_follows_latest_snapshot_and_faults_sum() {
        let a0 = stat(10, "zygote", 0, 0, 0);
        let a1 = stat(10, "com.android.phone", 2, 0, 0);
        let b0 = stat(11, "adbd", 0, 0, 0);
        let b1 = stat(11, "adbd", 5, 0, 0);
        let history = history_of(&[
            (
                0.0,
                0.0,
                &[
                    (CPU_KEY, "0 0 0 0 0 0 0 0 0 0"),
                    ("/proc/10/stat", a0.as_str()),
                    ("/proc/11/stat", b0.as_str()),
                ],
            ),
            (
                1.0,
                1.0,
                &[
                    (CPU_KEY, "1 0 0 1 0 0 0 0 0 0"),
                    ("/proc/10/stat", a1.as_str()),
                    ("/proc/11/stat", b1.as_str()),
                ],
            ),
        ]);
        let cpu = extract_cpu(&history);
        let (processes, total_faults) = extract_processes(&history, &cpu);

        assert_eq!(processes[&10].name, "com.android.phone");
        assert_eq!(total_faults.get(1.0), Some(&7));
        assert_eq!(total_faults.len(), 1);
    }

    #[test]
    fn test_same_pid_under_two_keys_overwrites() {
        let p0 = stat(42, "main", 0, 0, 0);
        let p1 = stat(42, "main", 5, 10, 10);
        let t0 = stat(42, "main", 0, 0, 0);
        let t1 = stat(42, "main", 2, 4, 4);
        let history = history_of(&[
            (
                0.0,
                0.0,
                &[
                    (CPU_KEY, "0 0 0 0 0 0 0 0 0 0"),
                    ("/proc/42/stat", p0.as_str()),
                    ("/proc/42/task/42/stat", t0.as_str()),
                ],
            ),
            (
                1.0,
                1.0,
                &[
                    (CPU_KEY, "100 0 0 0 0 0 0 0 0 0"),
                    ("/proc/42/stat", p1.as_str()),
                    ("/proc/42/task/42/stat", t1.as_str()),
                ],
            ),
        ]);
        let cpu = extract_cpu(&history);
        let (processes, total_faults) = extract_processes(&history, &cpu);

        // "/proc/42/task/42/stat" sorts after "/proc/42/stat".
        let p = &processes[&42];
        assert_eq!(p.faults.len(), 1);
        assert_eq!(p.faults.get(1.0), Some(&2));
        assert_eq!(p.sys.get(1.0), Some(&Fraction::new(4, 100)));
        assert_eq!(p.sys_user_total(), 8);
        assert_eq!(p.faults_total(), 2);
        assert_eq!(total_faults.len(), 1);
        assert_eq!(total_faults.get(1.0), Some(&2));
    }

    #[test]
    fn test_malformed_stat_is_ignored() {
        let history = history_of(&[
            (0.0, 0.0, &[(CPU_KEY, "0 0 0 0 0 0 0 0 0 0"), ("/proc/3/stat", "garbage")]),
            (1.0, 1.0, &[(CPU_KEY, "1 0 0 1 0 0 0 0 0 0")]),
        ]);
        let cpu = extract_cpu(&history);
        let (processes, _) = extract_processes(&history, &cpu);
        assert!(processes.is_empty());
    }
}

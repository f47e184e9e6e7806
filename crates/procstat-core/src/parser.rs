//! Parsers for the structured values recorded in the log.
//!
//! The log stores raw `/proc` content as opaque strings. These pure functions
//! decode the few key families the report understands. Callers treat a parse
//! failure as "key absent" for that snapshot.

/// Aggregate CPU line of `/proc/stat`.
pub const CPU_KEY: &str = "/proc/stat:cpu";
/// Context switch counter of `/proc/stat`.
pub const CTXT_KEY: &str = "/proc/stat:ctxt";
/// Prefix of YAFFS partition counters: `/proc/yaffs:<partition>:<var>`.
pub const YAFFS_PREFIX: &str = "/proc/yaffs:";

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

fn parse_i64(s: &str, name: &str) -> Result<i64, ParseError> {
    s.parse()
        .map_err(|_| ParseError::new(format!("invalid {}: {:?}", name, s)))
}

/// Parses a value holding a single integer counter.
pub fn parse_counter(value: &str) -> Result<i64, ParseError> {
    parse_i64(value.trim(), "counter")
}

/// CPU jiffies from the aggregate `cpu` line, grouped for charting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    /// user + nice
    pub user: i64,
    /// system + irq + softirq
    pub sys: i64,
    /// idle + iowait
    pub idle: i64,
}

impl CpuTimes {
    pub fn total(&self) -> i64 {
        self.user + self.sys + self.idle
    }
}

/// Parses the fields of the aggregate cpu line (without the `cpu` label).
///
/// Field order: user nice system idle iowait irq softirq [steal guest guest_nice].
/// Only the first seven are used; older kernels print no more than that.
pub fn parse_cpu_times(value: &str) -> Result<CpuTimes, ParseError> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.len() < 7 {
        return Err(ParseError::new(format!(
            "not enough fields in cpu line: expected 7+, got {}",
            fields.len()
        )));
    }

    let mut v = [0i64; 7];
    for (idx, slot) in v.iter_mut().enumerate() {
        *slot = parse_i64(fields[idx], "cpu field")?;
    }

    Ok(CpuTimes {
        user: v[0] + v[1],
        sys: v[2] + v[5] + v[6],
        idle: v[3] + v[4],
    })
}

/// Fields of `/proc/[pid]/stat` used by the report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub majflt: i64,
    pub utime: i64,
    pub stime: i64,
}

/// Returns true for keys holding a `/proc/[pid]/stat` line.
pub fn is_proc_stat_key(key: &str) -> bool {
    key.ends_with("/stat")
}

/// Parses `/proc/[pid]/stat` content.
///
/// The comm field can contain spaces and parentheses, so it is taken from
/// the first `(` to the last `)`.
/// Format: pid (comm) state ppid pgrp session tty_nr tpgid flags minflt cminflt majflt ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: u32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;

    let comm = content[open_paren + 1..close_paren].to_string();

    // Indices below are relative to the field after comm (state = 0).
    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() < 13 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 13+, got {}",
            fields.len()
        )));
    }

    Ok(ProcStat {
        pid,
        comm,
        majflt: parse_i64(fields[9], "majflt")?,
        utime: parse_i64(fields[11], "utime")?,
        stime: parse_i64(fields[12], "stime")?,
    })
}

/// YAFFS per-partition counters shown in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum YaffsCounter {
    BlockErasures,
    PageReads,
    PageWrites,
}

impl YaffsCounter {
    /// Column order used in partition charts.
    pub const ALL: [YaffsCounter; 3] = [
        YaffsCounter::BlockErasures,
        YaffsCounter::PageReads,
        YaffsCounter::PageWrites,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "nBlockErasures" => Some(YaffsCounter::BlockErasures),
            "nPageReads" => Some(YaffsCounter::PageReads),
            "nPageWrites" => Some(YaffsCounter::PageWrites),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            YaffsCounter::BlockErasures => "nBlockErasures",
            YaffsCounter::PageReads => "nPageReads",
            YaffsCounter::PageWrites => "nPageWrites",
        }
    }

    pub fn index(self) -> usize {
        match self {
            YaffsCounter::BlockErasures => 0,
            YaffsCounter::PageReads => 1,
            YaffsCounter::PageWrites => 2,
        }
    }
}

/// Splits `/proc/yaffs:<partition>:<var>` into partition and variable name.
///
/// Returns `None` for other keys and malformed keys.
pub fn split_yaffs_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix(YAFFS_PREFIX)?;
    let (partition, var) = rest.split_once(':')?;
    if var.contains(':') {
        return None;
    }
    Some((partition, var))
}

//! State replay: turns the operation stream into a history of snapshots.
//!
//! The log is a diff encoding of a key/value state. Replaying it keeps one
//! mutable current state and freezes a copy of it whenever a scan completes.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use tracing::{debug, warn};

use crate::decoder::{LogDecoder, Operation};
use crate::error::ReportError;

/// The key/value state as of one completed scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Midpoint of the scan, in seconds.
    pub timestamp: f64,
    pub state: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.state.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.contains_key(key)
    }

    /// Iterates keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.state.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Snapshots ordered by strictly increasing timestamp.
#[derive(Debug, Clone, Default)]
pub struct History {
    snapshots: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a snapshot at its sorted position.
    ///
    /// A snapshot with the same timestamp as an existing one replaces it.
    pub fn insert(&mut self, snapshot: Snapshot) {
        let ts = snapshot.timestamp;
        if self.snapshots.last().is_none_or(|last| last.timestamp < ts) {
            self.snapshots.push(snapshot);
            return;
        }
        match self
            .snapshots
            .binary_search_by(|s| s.timestamp.total_cmp(&ts))
        {
            Ok(idx) => {
                warn!("duplicate scan timestamp {}, replacing earlier snapshot", ts);
                self.snapshots[idx] = snapshot;
            }
            Err(idx) => {
                warn!("scan timestamp {} out of order, inserting at {}", ts, idx);
                self.snapshots.insert(idx, snapshot);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Snapshot> {
        self.snapshots.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    /// Consecutive `(previous, current)` snapshot pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&Snapshot, &Snapshot)> {
        self.snapshots.windows(2).map(|w| (&w[0], &w[1]))
    }

    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.snapshots.iter().map(|s| s.timestamp)
    }

    /// First and last snapshot timestamps in seconds, if any.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((
            self.snapshots.first()?.timestamp,
            self.snapshots.last()?.timestamp,
        ))
    }
}

/// Applies operations to the current state and collects snapshots.
#[derive(Debug, Default)]
pub struct Replayer {
    state: BTreeMap<String, String>,
    /// Start of the scan in progress.
    pending_start: Option<f64>,
    /// Start of the most recent scan, reused by an unmatched `EndScan`.
    last_start: f64,
    history: History,
}

impl Replayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, op: Operation) {
        match op {
            Operation::Set { key, value } => {
                self.state.insert(key, value);
            }
            Operation::Delete(key) => {
                self.state.remove(&key);
            }
            Operation::BeginScan(t) => {
                if let Some(stale) = self.pending_start.replace(t) {
                    debug!("scan started at {} never ended, restarting at {}", stale, t);
                }
                self.last_start = t;
            }
            Operation::EndScan(t) => {
                let start = match self.pending_start.take() {
                    Some(start) => start,
                    None => {
                        warn!(
                            "scan end at {} without a begin, using start {}",
                            t, self.last_start
                        );
                        self.last_start
                    }
                };
                self.history.insert(Snapshot {
                    timestamp: (start + t) / 2.0,
                    state: self.state.clone(),
                });
            }
        }
    }

    /// Current (unfrozen) state.
    pub fn state(&self) -> &BTreeMap<String, String> {
        &self.state
    }

    pub fn finish(self) -> History {
        self.history
    }
}

/// Decodes and replays a whole log, stopping at the first malformed line.
pub fn replay_reader<R: BufRead>(reader: R, path: &Path) -> Result<History, ReportError> {
    let mut decoder = LogDecoder::new(reader, path);
    let mut replayer = Replayer::new();
    for op in decoder.by_ref() {
        replayer.apply(op?);
    }
    let history = replayer.finish();
    debug!(
        "replayed {} lines into {} snapshots",
        decoder.line_count(),
        history.len()
    );
    Ok(history)
}

/// Opens and replays the log file at `path`.
pub fn replay_file(path: &Path) -> Result<History, ReportError> {
    let file = std::fs::File::open(path).map_err(|e| ReportError::io(path, e))?;
    replay_reader(std::io::BufReader::new(file), path)
}

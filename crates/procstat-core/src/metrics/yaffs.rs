//! YAFFS flash partition counters (`/proc/yaffs:<partition>:<var>`).

use std::collections::BTreeMap;

use tracing::trace;

use crate::parser::{YaffsCounter, parse_counter, split_yaffs_key};
use crate::replay::{History, Snapshot};

use super::{Series, delta};

/// Block erasures and page reads/writes of one partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionRecord {
    pub name: String,
    /// Indexed by [`YaffsCounter::index`].
    pub counters: [Series<i64>; 3],
}

impl PartitionRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn series(&self, counter: YaffsCounter) -> &Series<i64> {
        &self.counters[counter.index()]
    }

    /// Totals in [`YaffsCounter::ALL`] order.
    pub fn totals(&self) -> [i64; 3] {
        YaffsCounter::ALL.map(|c| self.series(c).total())
    }
}

fn counter(snapshot: &Snapshot, key: &str) -> Option<i64> {
    let value = snapshot.get(key)?;
    parse_counter(value)
        .inspect_err(|e| trace!("{} at {}: {}", key, snapshot.timestamp, e))
        .ok()
}

/// A partition is recorded once any of its variables has a delta, charted or not.
pub(super) fn extract_partitions(history: &History) -> BTreeMap<String, PartitionRecord> {
    let mut partitions: BTreeMap<String, PartitionRecord> = BTreeMap::new();

    for (prev, curr) in history.pairs() {
        for (key, _) in curr.iter() {
            let Some((partition, var)) = split_yaffs_key(key) else {
                continue;
            };
            let (Some(last), Some(next)) = (counter(prev, key), counter(curr, key)) else {
                continue;
            };

            if !partitions.contains_key(partition) {
                partitions.insert(partition.to_string(), PartitionRecord::new(partition));
            }
            if let (Some(record), Some(charted)) =
                (partitions.get_mut(partition), YaffsCounter::from_name(var))
            {
                record.counters[charted.index()].push(curr.timestamp, delta(next, last));
            }
        }
    }

    partitions
}

#[cfg(test)]
mod tests {
    use super::super::tests::history_of;
    use super::*;

    #[test]
    fn test_partition_deltas() {
        let history = history_of(&[
            (
                0.0,
                0.0,
                &[
                    ("/proc/yaffs:data:nPageReads", "100"),
                    ("/proc/yaffs:data:nPageWrites", "10"),
                    ("/proc/yaffs:data:nBlockErasures", "1"),
                ],
            ),
            (
                1.0,
                1.0,
                &[
                    ("/proc/yaffs:data:nPageReads", "150"),
                    ("/proc/yaffs:data:nPageWrites", "30"),
                    ("/proc/yaffs:data:nBlockErasures", "1"),
                ],
            ),
            (2.0, 2.0, &[("/proc/yaffs:data:nPageReads", "151")]),
        ]);
        let partitions = extract_partitions(&history);

        let data = &partitions["data"];
        assert_eq!(data.name, "data");
        assert_eq!(data.totals(), [0, 51, 20]);
        assert_eq!(data.series(YaffsCounter::PageReads).len(), 2);
        assert_eq!(data.series(YaffsCounter::PageWrites).get(2.0), Some(&0));
    }

    #[test]
    fn test_unknown_counters_still_register_partition() {
        let history = history_of(&[
            (
                0.0,
                0.0,
                &[
                    ("/proc/yaffs:cache:nErasureFailures", "3"),
                    ("/proc/yaffs:system:nPageReads", "n/a"),
                ],
            ),
            (
                1.0,
                1.0,
                &[
                    ("/proc/yaffs:cache:nErasureFailures", "9"),
                    ("/proc/yaffs:system:nPageReads", "12"),
                ],
            ),
        ]);
        let partitions = extract_partitions(&history);
        let names: Vec<&str> = partitions.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["cache"]);
        assert_eq!(partitions["cache"].totals(), [0, 0, 0]);
    }

    #[test]
    fn test_partitions_sorted_by_name() {
        let history = history_of(&[
            (
                0.0,
                0.0,
                &[
                    ("/proc/yaffs:system:nPageReads", "1"),
                    ("/proc/yaffs:cache:nPageReads", "1"),
                ],
            ),
            (
                1.0,
                1.0,
                &[
                    ("/proc/yaffs:system:nPageReads", "2"),
                    ("/proc/yaffs:cache:nPageReads", "2"),
                ],
            ),
        ]);
        let partitions = extract_partitions(&history);
        let names: Vec<&str> = partitions.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["cache", "system"]);
    }
}

//! Trunk Tally

use crate::classifier::ClassifiedCall;
use std::collections::{BTreeMap, BTreeSet};

/// Per-trunk call counts for one tick; rebuilt every tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrunkTally {
    counts: BTreeMap<String, u64>,
}

impl TrunkTally {
    pub fn from_calls(calls: &[ClassifiedCall]) -> Self {
        let mut counts = BTreeMap::new();
        for call in calls {
            *counts.entry(call.trunk_name.clone()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn get(&self, trunk: &str) -> u64 {
        self.counts.get(trunk).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(trunk, count)| (trunk.as_str(), *count))
    }
}

/// Every trunk label ever exposed
///
/// Survives ticks and restarts so a trunk that drops to zero calls is
/// written as 0 instead of keeping its last reading.
#[derive(Debug, Clone, Default)]
pub struct TrunkBook {
    seen: BTreeSet<String>,
}

impl TrunkBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gauge writes for this tick: every known trunk missing from `tally`
    /// at 0 first, then the tally's own counts
    pub fn apply(&mut self, tally: &TrunkTally) -> Vec<(String, u64)> {
        let mut writes: Vec<(String, u64)> = self
            .seen
            .iter()
            .filter(|trunk| tally.get(trunk) == 0)
            .map(|trunk| (trunk.clone(), 0))
            .collect();

        for (trunk, count) in tally.iter() {
            self.seen.insert(trunk.to_string());
            writes.push((trunk.to_string(), count));
        }

        writes
    }

    pub fn seen(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }
}

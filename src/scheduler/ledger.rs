use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

/// Maximum number of distinct days the activity histogram retains.
pub const MAX_ACTIVITY_DAYS: usize = 180;

/// Accepted submissions per calendar day.
///
/// Growth is capped by clearing the whole histogram when a new day would
/// exceed [`MAX_ACTIVITY_DAYS`]. It is not a sliding window.
#[derive(Debug, Default, Clone)]
pub struct ActivityHistogram {
    days: BTreeMap<NaiveDate, u64>,
}

impl ActivityHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, day: NaiveDate) {
        if let Some(count) = self.days.get_mut(&day) {
            *count += 1;
            return;
        }
        if self.days.len() >= MAX_ACTIVITY_DAYS {
            tracing::debug!(days = self.days.len(), "Activity histogram full, resetting");
            self.days.clear();
        }
        self.days.insert(day, 1);
    }

    pub fn get(&self, day: NaiveDate) -> Option<u64> {
        self.days.get(&day).copied()
    }

    /// Days in chronological order
    pub fn entries(&self) -> Vec<(NaiveDate, u64)> {
        self.days.iter().map(|(day, count)| (*day, *count)).collect()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Per-address contribution counts plus the set of addresses currently
/// connected.
///
/// Counts are never pruned. A worker reconnecting from a new source port
/// shows up as a new contributor.
#[derive(Debug, Default)]
pub struct ContributionLedger {
    counts: HashMap<String, u64>,
    connected: HashSet<String>,
    activity: ActivityHistogram,
}

impl ContributionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, worker: &str) {
        self.connected.insert(worker.to_string());
    }

    /// Clear presence only; the submission count is kept.
    pub fn disconnect(&mut self, worker: &str) {
        self.connected.remove(worker);
    }

    /// Count one accepted submission from `worker` on `day`.
    pub fn record(&mut self, worker: &str, day: NaiveDate) {
        *self.counts.entry(worker.to_string()).or_insert(0) += 1;
        self.activity.record(day);
    }

    pub fn count(&self, worker: &str) -> u64 {
        self.counts.get(worker).copied().unwrap_or(0)
    }

    pub fn unique_contributors(&self) -> usize {
        self.counts.len()
    }

    pub fn connected(&self) -> usize {
        self.connected.len()
    }

    pub fn is_connected(&self, worker: &str) -> bool {
        self.connected.contains(worker)
    }

    /// Raw `(address, count)` pairs in no particular order.
    pub fn counts(&self) -> Vec<(String, u64)> {
        self.counts
            .iter()
            .map(|(addr, count)| (addr.clone(), *count))
            .collect()
    }

    /// Contributors by descending count; ties ordered by address.
    pub fn ranking(&self) -> Vec<(String, u64)> {
        rank(self.counts())
    }

    pub fn activity(&self) -> &ActivityHistogram {
        &self.activity
    }
}

/// Sort contributors by descending count, then ascending address.
pub fn rank(mut counts: Vec<(String, u64)>) -> Vec<(String, u64)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

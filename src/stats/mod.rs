//! Read-only statistics over the dispatch state.
//!
//! [`StatsSnapshot`] is assembled by
//! [`DispatchCoordinator::snapshot`](crate::scheduler::DispatchCoordinator::snapshot)
//! from values copied under the dispatch lock. Everything derived from
//! those values (throughput, labels, HTML) is computed afterwards.

mod render;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Label format for histogram days.
pub const DAY_LABEL_FORMAT: &str = "%m/%d/%y";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributorEntry {
    pub address: String,
    pub contributions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub day: NaiveDate,
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub running_since: DateTime<Utc>,
    pub uptime_secs: i64,
    pub pending: usize,
    pub initial: usize,
    pub contributions_per_minute: f64,
    pub unique_contributors: usize,
    pub connected_workers: usize,
    /// Highest count first
    pub top_contributors: Vec<ContributorEntry>,
    /// Oldest day first
    pub activity: Vec<ActivityEntry>,
}

impl StatsSnapshot {
    pub fn new(
        running_since: DateTime<Utc>,
        now: DateTime<Utc>,
        pending: usize,
        initial: usize,
        connected_workers: usize,
        ranking: Vec<(String, u64)>,
        activity: Vec<(NaiveDate, u64)>,
    ) -> Self {
        let uptime_secs = (now - running_since).num_seconds().max(0);
        Self {
            running_since,
            uptime_secs,
            pending,
            initial,
            contributions_per_minute: contributions_per_minute(initial, pending, uptime_secs),
            unique_contributors: ranking.len(),
            connected_workers,
            top_contributors: ranking
                .into_iter()
                .map(|(address, contributions)| ContributorEntry {
                    address,
                    contributions,
                })
                .collect(),
            activity: activity
                .into_iter()
                .map(|(day, count)| ActivityEntry {
                    day,
                    label: day.format(DAY_LABEL_FORMAT).to_string(),
                    count,
                })
                .collect(),
        }
    }

    /// Jobs no longer pending (completed or currently held by a worker).
    pub fn dispatched(&self) -> usize {
        self.initial.saturating_sub(self.pending)
    }

    pub fn render_html(&self) -> String {
        render::render_html(self)
    }
}

/// `(initial - pending)` per elapsed minute; zero before the first second.
pub fn contributions_per_minute(initial: usize, pending: usize, uptime_secs: i64) -> f64 {
    if uptime_secs <= 0 {
        return 0.0;
    }
    let done = initial.saturating_sub(pending) as f64;
    done / (uptime_secs as f64 / 60.0)
}

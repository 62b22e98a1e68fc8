use chrono::{DateTime, Local, NaiveDate, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::scheduler::job::Job;
use crate::scheduler::ledger::{rank, ContributionLedger};
use crate::scheduler::pool::JobPool;
use crate::stats::StatsSnapshot;

/// Outcome of asking the coordinator for a worker's next job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// The worker now holds `job`, issued at `assigned_at` (unix seconds).
    Assigned { job: Job, assigned_at: u64 },
    /// Nothing left to hand out; the server is shutting down.
    Drained,
}

#[derive(Debug)]
struct DispatchState {
    pool: JobPool,
    ledger: ContributionLedger,
    drained: bool,
}

/// Owner of all shared dispatch state.
///
/// The job pool and the contribution ledger sit behind a single mutex. The
/// lock is only ever held for in-memory bookkeeping, never across a network
/// send or a file write, and nothing awaits while holding it.
///
/// Draining the pool is a global event: the first time a pop finds the pool
/// empty the shutdown token is cancelled and every later request answers
/// [`Assignment::Drained`], even if a disconnect has since requeued a job.
#[derive(Debug)]
pub struct DispatchCoordinator {
    state: Mutex<DispatchState>,
    initial_size: usize,
    started_at: DateTime<Utc>,
    shutdown: CancellationToken,
}

impl DispatchCoordinator {
    pub fn new(jobs: Vec<Job>, shutdown: CancellationToken) -> Self {
        let initial_size = jobs.len();
        Self {
            state: Mutex::new(DispatchState {
                pool: JobPool::from_jobs(jobs),
                ledger: ContributionLedger::new(),
                drained: false,
            }),
            initial_size,
            started_at: Utc::now(),
            shutdown,
        }
    }

    /// Connect path: mark `worker` present and hand it the oldest job.
    pub fn assign_next(&self, worker: &str) -> Assignment {
        let mut state = self.state.lock();
        state.ledger.connect(worker);
        self.pop_locked(&mut state)
    }

    /// Accept path: credit `worker` with one submission on `day`, then hand
    /// it the next job.
    pub fn advance(&self, worker: &str, day: NaiveDate) -> Assignment {
        let mut state = self.state.lock();
        state.ledger.record(worker, day);
        self.pop_locked(&mut state)
    }

    /// Put an abandoned job back at the end of the pool.
    pub fn requeue(&self, job: Job) {
        self.state.lock().pool.push_back(job);
    }

    /// Disconnect path: requeue whatever `worker` still held and clear its
    /// presence, in one critical section.
    pub fn disconnect(&self, worker: &str, held: Option<Job>) {
        let mut state = self.state.lock();
        if let Some(job) = held {
            state.pool.push_back(job);
        }
        state.ledger.disconnect(worker);
    }

    fn pop_locked(&self, state: &mut DispatchState) -> Assignment {
        if state.drained || self.shutdown.is_cancelled() {
            return Assignment::Drained;
        }
        match state.pool.pop_front() {
            Some(job) => Assignment::Assigned {
                job,
                assigned_at: unix_now(),
            },
            None => {
                state.drained = true;
                tracing::info!(initial = self.initial_size, "Finished! Job pool drained");
                self.shutdown.cancel();
                Assignment::Drained
            }
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot_at(Utc::now())
    }

    /// Copy the raw figures under the lock; ranking and the derived rates
    /// are computed after it is released.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> StatsSnapshot {
        let (pending, counts, connected, activity) = {
            let state = self.state.lock();
            (
                state.pool.len(),
                state.ledger.counts(),
                state.ledger.connected(),
                state.ledger.activity().entries(),
            )
        };
        StatsSnapshot::new(
            self.started_at,
            now,
            pending,
            self.initial_size,
            connected,
            rank(counts),
            activity,
        )
    }

    pub fn pending(&self) -> usize {
        self.state.lock().pool.len()
    }

    /// Pool contents in dispatch order
    pub fn pending_jobs(&self) -> Vec<Job> {
        self.state.lock().pool.iter().cloned().collect()
    }

    pub fn contributions(&self, worker: &str) -> u64 {
        self.state.lock().ledger.count(worker)
    }

    pub fn is_connected(&self, worker: &str) -> bool {
        self.state.lock().ledger.is_connected(worker)
    }

    pub fn is_drained(&self) -> bool {
        self.state.lock().drained
    }

    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

/// Calendar day used for the activity histogram.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

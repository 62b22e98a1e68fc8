use std::collections::VecDeque;

use crate::scheduler::job::Job;

/// Pending jobs in FIFO order.
///
/// Has no locking of its own; the [`DispatchCoordinator`] owns the only
/// instance behind its mutex.
///
/// [`DispatchCoordinator`]: crate::scheduler::DispatchCoordinator
#[derive(Debug, Default)]
pub struct JobPool {
    jobs: VecDeque<Job>,
}

impl JobPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        Self {
            jobs: jobs.into_iter().collect(),
        }
    }

    /// Remove and return the oldest pending job
    pub fn pop_front(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    /// Return a job to circulation behind everything already pending
    pub fn push_back(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }
}

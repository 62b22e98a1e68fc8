//! Per-connection state machine.
//!
//! ```text
//! UNASSIGNED --connect--> ASSIGNED --message (accepted)--> ASSIGNED
//!      |                     |
//!      +-----(drained)-------+--(rejected / send failure / close)--> TERMINATED
//! ```
//!
//! A [`Session`] is owned by the connection task for the connection's
//! lifetime. Teardown is tied to ownership: dropping the session (or calling
//! [`Session::close`]) returns any held job to the pool exactly once, even
//! when the connection task is aborted.

use std::sync::Arc;

use crate::admission::AdmissionFilter;
use crate::error::Rejection;
use crate::scheduler::coordinator::today;
use crate::scheduler::{Assignment, DispatchCoordinator, Job};
use crate::storage::ResponseSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unassigned,
    Assigned,
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unassigned => write!(f, "unassigned"),
            SessionState::Assigned => write!(f, "assigned"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

/// What the transport should do after a session event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Deliver this job to the worker.
    Send(Job),
    /// The pool is drained. Close the connection; the server is stopping.
    Finished,
}

pub struct Session {
    worker: String,
    coordinator: Arc<DispatchCoordinator>,
    filter: AdmissionFilter,
    current_job: Option<Job>,
    assigned_at: u64,
    released: bool,
}

impl Session {
    pub fn new(
        worker: impl Into<String>,
        coordinator: Arc<DispatchCoordinator>,
        filter: AdmissionFilter,
    ) -> Self {
        Self {
            worker: worker.into(),
            coordinator,
            filter,
            current_job: None,
            assigned_at: 0,
            released: false,
        }
    }

    /// Take the first job for this worker.
    pub fn connect(&mut self) -> Step {
        let assignment = self.coordinator.assign_next(&self.worker);
        self.apply(assignment)
    }

    /// Handle one submission for the job currently held.
    ///
    /// On rejection the held job is left untouched; the caller closes the
    /// connection and teardown requeues it.
    pub fn on_message(
        &mut self,
        payload: &str,
        sink: &dyn ResponseSink,
    ) -> Result<Step, Rejection> {
        let job = match (&self.current_job, self.released) {
            (Some(job), false) => job.clone(),
            _ => return Err(Rejection::NoJobHeld),
        };

        let submission = self.filter.check(payload, self.assigned_at)?;

        if !submission.is_skip() {
            sink.record(&job, &submission.response)
                .map_err(|e| Rejection::SinkFailed(e.to_string()))?;
        } else {
            tracing::debug!(worker = %self.worker, "Job skipped by worker");
        }

        // The accepted job is retired here; `apply` replaces it
        let assignment = self.coordinator.advance(&self.worker, today());
        Ok(self.apply(assignment))
    }

    fn apply(&mut self, assignment: Assignment) -> Step {
        match assignment {
            Assignment::Assigned { job, assigned_at } => {
                self.current_job = Some(job.clone());
                self.assigned_at = assigned_at;
                Step::Send(job)
            }
            Assignment::Drained => {
                self.current_job = None;
                Step::Finished
            }
        }
    }

    /// End the session, logging how the connection went away.
    pub fn close(mut self, clean: bool) {
        self.release();
        tracing::info!(
            worker = %self.worker,
            "Client {} disconnected from job server",
            if clean { "cleanly" } else { "uncleanly" }
        );
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let held = self.current_job.take();
        if let Some(job) = &held {
            tracing::debug!(worker = %self.worker, job = %job, "Requeueing abandoned job");
        }
        self.coordinator.disconnect(&self.worker, held);
    }

    pub fn state(&self) -> SessionState {
        if self.released {
            SessionState::Terminated
        } else if self.current_job.is_some() {
            SessionState::Assigned
        } else {
            SessionState::Unassigned
        }
    }

    pub fn current_job(&self) -> Option<&Job> {
        self.current_job.as_ref()
    }

    /// Unix seconds at which the current job was handed out
    pub fn assigned_at(&self) -> u64 {
        self.assigned_at
    }

    pub fn worker(&self) -> &str {
        &self.worker
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

pub mod coordinator;
pub mod job;
pub mod ledger;
pub mod pool;

pub use coordinator::{Assignment, DispatchCoordinator};
pub use job::Job;
pub use ledger::{ActivityHistogram, ContributionLedger, MAX_ACTIVITY_DAYS};
pub use pool::JobPool;

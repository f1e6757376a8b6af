//! Port traits the dispatcher reads from and invokes.
//!
//! Infrastructure crates implement these; the dispatcher never knows how a
//! job is configured or how a poll is carried out.
//!
//! All ports are synchronous. The dispatcher runs on the request task and must
//! return promptly, so a [`Trigger`] that does real work enqueues it and
//! returns immediately.

use std::sync::Arc;

use crate::errors::{LocationLookupError, TriggerInvocationError};
use crate::{Cause, JobName, ModuleLocation};

/// The polling action configured on a job.
///
/// `run` is NOT assumed idempotent: every call may enqueue another poll.
pub trait Trigger: Send + Sync {
    /// Schedules (or performs) one poll of the job's repository.
    ///
    /// # Errors
    ///
    /// [`TriggerInvocationError`] when the poll could not be scheduled.
    fn run(&self, causes: &[Cause]) -> Result<(), TriggerInvocationError>;
}

/// A configured build job, as seen by the dispatcher.
pub trait Job: Send + Sync {
    /// Unique job name, used in logs and in [`crate::DispatchResult`].
    fn name(&self) -> &JobName;

    /// Returns `true` when an operator has paused the job.
    fn is_disabled(&self) -> bool;

    /// Source-control modules the job checks out, in configuration order.
    ///
    /// # Errors
    ///
    /// [`LocationLookupError`] when the job's source-control configuration
    /// cannot be read.
    fn source_control_locations(&self) -> Result<Vec<ModuleLocation>, LocationLookupError>;

    /// The job's polling trigger, if one is configured.
    fn polling_trigger(&self) -> Option<Arc<dyn Trigger>>;
}

/// Read-only view of every configured job.
pub trait JobRegistry: Send + Sync {
    /// Returns the jobs configured at the time of the call.
    ///
    /// Implementations may return a snapshot; jobs added concurrently may or
    /// may not be included.
    fn list_all_jobs(&self) -> Vec<Arc<dyn Job>>;
}

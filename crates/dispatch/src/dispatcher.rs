//! The notification dispatcher.
//!
//! Given one [`Notification`] and the match predicate a provider adapter built
//! for it, the dispatcher walks every configured job and runs the polling
//! trigger of each enabled job that has a matching location.
//!
//! ## Per-job rules
//!
//! 1. Disabled jobs are skipped without evaluating the predicate.
//! 2. Locations are tested in order; the first `true` wins. A location whose
//!    evaluation fails counts as non-matching and the next one is tried.
//! 3. A matching job without a polling trigger is skipped.
//! 4. Otherwise the trigger runs exactly once, however many locations matched.
//!
//! Failures (errors or panics) from one job are logged and recorded as
//! [`JobOutcome::Failed`]; they never stop the remaining jobs. `dispatch`
//! itself has no error path.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::UnresolvableIdentityError;
use crate::matching::MatchPredicate;
use crate::ports::{Job, JobRegistry};
use crate::{Cause, JobName, Notification, NotificationId};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What happened to one job during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The job's trigger ran.
    Triggered,
    /// The job is disabled; no predicate evaluation took place.
    Disabled,
    /// None of the job's locations belongs to the notifying repository.
    NoMatch,
    /// A location matched but the job has no polling trigger.
    NoTrigger,
    /// Location lookup or trigger invocation failed.
    Failed {
        /// Diagnostic recorded in the log.
        reason: String,
    },
}

/// A job name paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: JobName,
    #[serde(flatten)]
    pub outcome: JobOutcome,
}

/// Outcome of dispatching one notification.
///
/// Used for logging and tests; the webhook sender only sees an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    notification_id: NotificationId,
    reports: Vec<JobReport>,
}

impl DispatchResult {
    /// A result in which no job was considered.
    pub fn empty(notification_id: NotificationId) -> Self {
        Self {
            notification_id,
            reports: Vec::new(),
        }
    }

    pub fn notification_id(&self) -> NotificationId {
        self.notification_id
    }

    /// Per-job outcomes in evaluation order.
    pub fn reports(&self) -> &[JobReport] {
        &self.reports
    }

    /// Names of the jobs whose trigger ran.
    pub fn triggered(&self) -> impl Iterator<Item = &JobName> {
        self.reports
            .iter()
            .filter(|r| r.outcome == JobOutcome::Triggered)
            .map(|r| &r.job)
    }

    pub fn triggered_count(&self) -> usize {
        self.triggered().count()
    }

    /// Returns the outcome recorded for the named job, if it was evaluated.
    pub fn outcome_for(&self, job: &str) -> Option<&JobOutcome> {
        self.reports
            .iter()
            .find(|r| r.job.as_str() == job)
            .map(|r| &r.outcome)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Dispatches notifications to the jobs of one registry.
///
/// Holds no mutable state, so one instance can serve any number of concurrent
/// requests.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<dyn JobRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<dyn JobRegistry>) -> Self {
        Self { registry }
    }

    /// Dispatches `notification` to every job currently in the registry.
    ///
    /// When `predicate` is unresolvable the registry is not even consulted and
    /// the result is empty.
    pub fn dispatch<P>(
        &self,
        notification: &Notification,
        predicate: Result<P, UnresolvableIdentityError>,
    ) -> DispatchResult
    where
        P: MatchPredicate,
    {
        match predicate {
            Ok(predicate) => {
                let jobs = self.registry.list_all_jobs();
                dispatch_jobs(&jobs, notification, &predicate)
            }
            Err(e) => {
                debug!(
                    notification_id = %notification.id(),
                    error = %e,
                    "No repository identity; skipping dispatch"
                );
                DispatchResult::empty(notification.id())
            }
        }
    }
}

/// Dispatches `notification` over an explicit job sequence.
///
/// This is the whole matching and triggering algorithm; [`Dispatcher`] only
/// adds the registry lookup.
#[tracing::instrument(
    name = "dispatch",
    skip_all,
    fields(notification_id = %notification.id(), provider = %notification.provider())
)]
pub fn dispatch_jobs<P>(
    jobs: &[Arc<dyn Job>],
    notification: &Notification,
    predicate: &P,
) -> DispatchResult
where
    P: MatchPredicate + ?Sized,
{
    let causes = [notification.cause()];
    let mut result = DispatchResult::empty(notification.id());

    for job in jobs {
        let name = job.name().clone();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            evaluate_job(job.as_ref(), predicate, &causes)
        }))
        .unwrap_or_else(|panic| {
            let reason = panic_message(panic.as_ref());
            warn!(job = %name, reason = %reason, "Job evaluation panicked");
            JobOutcome::Failed { reason }
        });

        result.reports.push(JobReport { job: name, outcome });
    }

    info!(
        evaluated = result.reports.len(),
        triggered = result.triggered_count(),
        revision = %notification.revision(),
        "Dispatch complete"
    );

    result
}

fn evaluate_job<P>(job: &dyn Job, predicate: &P, causes: &[Cause]) -> JobOutcome
where
    P: MatchPredicate + ?Sized,
{
    let name = job.name();

    if job.is_disabled() {
        debug!(job = %name, "Job is disabled; skipping");
        return JobOutcome::Disabled;
    }

    let locations = match job.source_control_locations() {
        Ok(locations) => locations,
        Err(e) => {
            warn!(job = %name, error = %e, "Cannot list job locations");
            return JobOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    let matched = locations
        .iter()
        .any(|location| match predicate.matches(location) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(
                    job = %name,
                    location = location.remote(),
                    error = %e,
                    "Cannot evaluate location; treating as non-matching"
                );
                false
            }
        });

    if !matched {
        return JobOutcome::NoMatch;
    }

    let Some(trigger) = job.polling_trigger() else {
        debug!(job = %name, "Job matches but has no polling trigger");
        return JobOutcome::NoTrigger;
    };

    match trigger.run(causes) {
        Ok(()) => {
            info!(job = %name, "Scheduled polling");
            JobOutcome::Triggered
        }
        Err(e) => {
            warn!(job = %name, error = %e, "Polling trigger failed");
            JobOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

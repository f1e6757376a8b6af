//! Error types for notification handling.
//!
//! Every error here originates from untrusted notification content or from a
//! single job, and every one of them is contained at the smallest possible
//! scope: it becomes a log entry and "this unit contributes nothing". None of
//! them may turn into a non-200 response or abort processing of other jobs.
//!
//! | Error | Scope | Effect |
//! |-------|-------|--------|
//! | [`MalformedInputError`] | request | notification dropped, 200 returned |
//! | [`UnresolvableIdentityError`] | request | dispatch short-circuits to an empty result |
//! | [`PredicateEvaluationError`] | location | location treated as non-matching |
//! | [`LocationLookupError`] | job | job not triggered |
//! | [`TriggerInvocationError`] | job | job not triggered |

use thiserror::Error;

use crate::JobName;

// ---------------------------------------------------------------------------
// Request-level errors
// ---------------------------------------------------------------------------

/// A field the provider adapter requires is entirely absent from the request.
///
/// A field that is present but empty is NOT malformed; adapters treat it as
/// "unknown".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed notification: required parameter '{parameter}' is missing")]
pub struct MalformedInputError {
    /// Name of the missing request parameter.
    pub parameter: String,
}

impl MalformedInputError {
    /// Creates an error for the named parameter.
    pub fn missing(parameter: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
        }
    }
}

/// The provider adapter could not build a repository identity from the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnresolvableIdentityError {
    /// A parameter needed to form the repository identity is absent or blank.
    #[error("Cannot resolve repository identity: parameter '{parameter}' is missing")]
    MissingParameter {
        /// Name of the missing request parameter.
        parameter: String,
    },

    /// The parameters were present but do not form a valid repository URL.
    #[error("Cannot resolve repository identity from '{candidate}': {reason}")]
    InvalidIdentity {
        /// The identity the adapter attempted to build.
        candidate: String,
        /// Why the candidate was rejected.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Location-level errors
// ---------------------------------------------------------------------------

/// A match predicate could not decide whether a location belongs to the
/// notifying repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateEvaluationError {
    /// The location's canonical repository root has not been determined.
    #[error("Repository root of '{remote}' is unknown")]
    UnknownRepositoryRoot {
        /// Remote URL of the location.
        remote: String,
    },

    /// A repository URL could not be parsed.
    #[error("Malformed repository URL '{url}': {reason}")]
    MalformedRepositoryUrl {
        /// The offending URL text.
        url: String,
        /// Parser diagnostic.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Job-level errors
// ---------------------------------------------------------------------------

/// A job's source-control locations could not be listed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot list source-control locations of job '{job}': {reason}")]
pub struct LocationLookupError {
    /// The job whose locations were requested.
    pub job: JobName,
    /// Why the lookup failed.
    pub reason: String,
}

/// A job's polling trigger rejected the request to poll.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerInvocationError {
    /// The poll queue is at capacity; the poll was not scheduled.
    #[error("Poll queue is full; poll for job '{job}' was dropped")]
    QueueFull {
        /// The job whose poll was dropped.
        job: JobName,
    },

    /// The poll worker has shut down.
    #[error("Poll queue is closed; poll for job '{job}' was dropped")]
    QueueClosed {
        /// The job whose poll was dropped.
        job: JobName,
    },

    /// Any other trigger-specific failure.
    #[error("Trigger for job '{job}' failed: {reason}")]
    Failed {
        /// The job whose trigger failed.
        job: JobName,
        /// Trigger-specific diagnostic.
        reason: String,
    },
}

//! Core notification dispatch for pollhook.
//!
//! This crate turns a parsed push notification into polls of the configured
//! jobs whose source-control locations belong to the notifying repository.
//! Infrastructure crates implement the port traits defined here; they never
//! add matching or triggering rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a job, trigger and registry must offer; infrastructure
//! crates define *how* to supply them.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`NotificationId`, `JobName`, `ProviderName`) |
//! | [`types`] | Value types (`Revision`, `AffectedPaths`, `RepositoryUrl`, `Timestamp`) |
//! | [`errors`] | The notification error taxonomy |
//! | [`notification`] | `Notification` and `Cause` |
//! | [`location`] | `ModuleLocation` |
//! | [`ports`] | `Job`, `Trigger` and `JobRegistry` traits |
//! | [`matching`] | `MatchPredicate` and `RepositoryMatcher` |
//! | [`dispatcher`] | `Dispatcher`, `dispatch_jobs` and `DispatchResult` |

pub mod dispatcher;
pub mod errors;
#[cfg(any(test, feature = "fakes"))]
pub mod fakes;
pub mod identifiers;
pub mod location;
pub mod matching;
pub mod notification;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use dispatcher::{dispatch_jobs, DispatchResult, Dispatcher, JobOutcome, JobReport};
pub use errors::{
    LocationLookupError, MalformedInputError, PredicateEvaluationError, TriggerInvocationError,
    UnresolvableIdentityError,
};
pub use identifiers::{JobName, NotificationId, ProviderName};
pub use location::ModuleLocation;
pub use matching::{MatchPredicate, RepositoryMatcher};
pub use notification::{Cause, Notification};
pub use ports::{Job, JobRegistry, Trigger};
pub use types::{AffectedPaths, RepositoryUrl, Revision, Timestamp};

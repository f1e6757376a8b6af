//! Match predicates deciding whether a location belongs to the notifying
//! repository.
//!
//! A predicate is built once per request by a provider adapter and borrowed by
//! the dispatch loop. Any closure with the right signature is a predicate;
//! [`RepositoryMatcher`] is the one every adapter in this workspace produces.

use crate::errors::PredicateEvaluationError;
use crate::{ModuleLocation, RepositoryUrl};

/// Decides whether a location refers to the repository a notification is about.
pub trait MatchPredicate {
    /// Returns `true` when `location` belongs to the notifying repository.
    ///
    /// # Errors
    ///
    /// [`PredicateEvaluationError`] when the location cannot be compared. The
    /// dispatcher treats the location as non-matching and moves on.
    fn matches(&self, location: &ModuleLocation) -> Result<bool, PredicateEvaluationError>;
}

impl<F> MatchPredicate for F
where
    F: Fn(&ModuleLocation) -> Result<bool, PredicateEvaluationError>,
{
    fn matches(&self, location: &ModuleLocation) -> Result<bool, PredicateEvaluationError> {
        self(location)
    }
}

/// Matches locations whose canonical repository root equals a fixed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMatcher {
    root: RepositoryUrl,
}

impl RepositoryMatcher {
    pub fn new(root: RepositoryUrl) -> Self {
        Self { root }
    }

    /// The repository root this matcher accepts.
    pub fn root(&self) -> &RepositoryUrl {
        &self.root
    }
}

impl MatchPredicate for RepositoryMatcher {
    fn matches(&self, location: &ModuleLocation) -> Result<bool, PredicateEvaluationError> {
        Ok(location.repository_root()? == &self.root)
    }
}

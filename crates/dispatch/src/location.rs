//! Source-control module locations.

use serde::{Deserialize, Serialize};

use crate::errors::PredicateEvaluationError;
use crate::RepositoryUrl;

/// A Subversion module a job checks out.
///
/// `remote` is the URL as configured (usually pointing inside the repository,
/// e.g. `.../test/trunk`), `local` is the checkout directory relative to the
/// workspace. The canonical repository root cannot be derived from `remote`
/// alone, so it is supplied precomputed; a location without one fails
/// predicate evaluation rather than silently never matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleLocation {
    remote: String,
    local: String,
    repository_root: Option<RepositoryUrl>,
}

impl ModuleLocation {
    /// Creates a location whose repository root is not yet known.
    pub fn new(remote: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            local: local.into(),
            repository_root: None,
        }
    }

    /// Creates a location with a precomputed canonical repository root.
    pub fn with_repository_root(
        remote: impl Into<String>,
        local: impl Into<String>,
        repository_root: RepositoryUrl,
    ) -> Self {
        Self {
            remote: remote.into(),
            local: local.into(),
            repository_root: Some(repository_root),
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    /// Returns the canonical repository root.
    ///
    /// # Errors
    ///
    /// [`PredicateEvaluationError::UnknownRepositoryRoot`] when the root was
    /// never supplied.
    pub fn repository_root(&self) -> Result<&RepositoryUrl, PredicateEvaluationError> {
        self.repository_root
            .as_ref()
            .ok_or_else(|| PredicateEvaluationError::UnknownRepositoryRoot {
                remote: self.remote.clone(),
            })
    }
}

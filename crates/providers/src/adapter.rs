//! The provider adapter contract and the registry of enabled adapters.

use std::collections::BTreeMap;
use std::sync::Arc;

use dispatch::{
    AffectedPaths, MalformedInputError, ProviderName, RepositoryMatcher, Revision,
    UnresolvableIdentityError,
};
use thiserror::Error;

use crate::RequestParams;

/// Everything the listener needs from one hosting provider.
///
/// Implementations are pure functions over the request parameters: no I/O,
/// no state between calls. They log their own soft failures (informational
/// for bad revisions, warning for unresolvable identities) because only they
/// know which provider field was at fault.
pub trait ProviderAdapter: Send + Sync {
    /// Provider name recorded in every cause (e.g. `"cloudforge"`).
    fn name(&self) -> &ProviderName;

    /// Path segment the endpoint is exposed under (e.g. `"cloudforge-webhook"`).
    fn url_name(&self) -> &str;

    /// Extracts the set of changed paths.
    ///
    /// # Errors
    ///
    /// [`MalformedInputError`] when the field is entirely absent. A present
    /// but empty field yields an empty set.
    fn extract_affected_paths(
        &self,
        params: &RequestParams,
    ) -> Result<AffectedPaths, MalformedInputError>;

    /// Extracts the revision; unknown when missing or not a number.
    fn extract_revision(&self, params: &RequestParams) -> Revision;

    /// Builds the predicate matching locations of the notifying repository.
    ///
    /// # Errors
    ///
    /// [`UnresolvableIdentityError`] when the request does not identify a
    /// repository.
    fn build_match_predicate(
        &self,
        params: &RequestParams,
    ) -> Result<RepositoryMatcher, UnresolvableIdentityError>;
}

/// Errors raised while assembling a [`ProviderRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two adapters claimed the same endpoint path.
    #[error("Endpoint '/{url_name}' is already registered by provider '{existing}'")]
    DuplicateEndpoint {
        /// The contested path segment.
        url_name: String,
        /// Provider that registered the path first.
        existing: ProviderName,
    },
}

/// The set of enabled providers, keyed by endpoint path segment.
///
/// Built once at startup and shared read-only by every request.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: BTreeMap<String, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an adapter.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateEndpoint`] if another adapter already uses
    /// the same [`ProviderAdapter::url_name`].
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) -> Result<(), RegistryError> {
        let url_name = adapter.url_name().to_string();
        if let Some(existing) = self.adapters.get(&url_name) {
            return Err(RegistryError::DuplicateEndpoint {
                url_name,
                existing: existing.name().clone(),
            });
        }
        self.adapters.insert(url_name, adapter);
        Ok(())
    }

    /// Looks up the adapter serving `url_name`.
    pub fn get(&self, url_name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(url_name).cloned()
    }

    /// Endpoint path segments in sorted order.
    pub fn url_names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

//! pollhook provider adapters.
//!
//! Each hosting provider formats its push notifications differently. An
//! adapter turns one provider's request parameters into the three inputs the
//! [`dispatch`] crate needs: the affected paths, the revision and a
//! [`dispatch::RepositoryMatcher`] for the notifying repository.
//!
//! | Adapter | Endpoint | Identity fields |
//! |---------|----------|-----------------|
//! | [`CloudForgeAdapter`] | `/cloudforge-webhook` | `organization`, `project` |
//! | [`SvnAdapter`] | `/svn-webhook` | `repository` |
//!
//! Adapters are registered as data in a [`ProviderRegistry`]; the listener
//! looks them up by endpoint path and the dispatcher never sees them.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain matching or triggering
//! rules. All provider field names and URL conventions live here; the
//! [`dispatch`] crate never sees them.

pub mod adapter;
pub mod cloudforge;
pub mod params;
pub mod svn;

pub use adapter::{ProviderAdapter, ProviderRegistry, RegistryError};
pub use cloudforge::{CloudForgeAdapter, CloudForgeConfig};
pub use params::RequestParams;
pub use svn::{SvnAdapter, SvnConfig};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Provider settings, one table per adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub cloudforge: CloudForgeConfig,
    pub svn: SvnConfig,
}

impl ProvidersConfig {
    /// Builds a registry holding every enabled adapter.
    ///
    /// # Errors
    ///
    /// [`RegistryError`] if two enabled adapters claim the same endpoint.
    pub fn build_registry(&self) -> Result<ProviderRegistry, RegistryError> {
        let mut registry = ProviderRegistry::new();
        if self.cloudforge.enabled {
            registry.register(Arc::new(CloudForgeAdapter::new(&self.cloudforge)))?;
        }
        if self.svn.enabled {
            registry.register(Arc::new(SvnAdapter::new()))?;
        }
        Ok(registry)
    }
}

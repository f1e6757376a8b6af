//! CloudForge post-commit webhook.
//!
//! CloudForge posts `service`, `organization`, `project`, `changed` and
//! `youngest`. The repository root is not sent directly; it is rebuilt as
//! `https://<organization>.<domain_suffix>/<project>`.

use dispatch::{
    AffectedPaths, MalformedInputError, ProviderName, RepositoryMatcher, RepositoryUrl, Revision,
    UnresolvableIdentityError,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::{svn, ProviderAdapter, RequestParams};

/// Parameter naming the CloudForge project (the repository path).
pub const PARAM_PROJECT: &str = "project";
/// Parameter naming the CloudForge organization (the host prefix).
pub const PARAM_ORGANIZATION: &str = "organization";

const DEFAULT_DOMAIN_SUFFIX: &str = "svn.cloudforge.com";

/// Settings for the CloudForge endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudForgeConfig {
    /// Whether `/cloudforge-webhook` is exposed.
    pub enabled: bool,
    /// Host suffix appended to the organization to form the repository host.
    pub domain_suffix: String,
}

impl Default for CloudForgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            domain_suffix: DEFAULT_DOMAIN_SUFFIX.to_string(),
        }
    }
}

/// Adapter for CloudForge Subversion webhooks.
#[derive(Debug, Clone)]
pub struct CloudForgeAdapter {
    name: ProviderName,
    domain_suffix: String,
}

impl CloudForgeAdapter {
    pub fn new(config: &CloudForgeConfig) -> Self {
        Self {
            name: ProviderName::from_static("cloudforge"),
            domain_suffix: config.domain_suffix.trim_matches('.').to_ascii_lowercase(),
        }
    }

    /// Rebuilds the canonical repository root for an organization and project.
    ///
    /// # Errors
    ///
    /// [`UnresolvableIdentityError::InvalidIdentity`] when the organization is
    /// not a single host label or the result is not a valid URL.
    pub fn repository_root(
        &self,
        organization: &str,
        project: &str,
    ) -> Result<RepositoryUrl, UnresolvableIdentityError> {
        let host = format!("{organization}.{}", self.domain_suffix);
        let path = project.trim_matches('/');
        let candidate = format!("https://{host}/{path}");

        let invalid = |reason: String| UnresolvableIdentityError::InvalidIdentity {
            candidate: candidate.clone(),
            reason,
        };

        if !is_host_label(organization) {
            return Err(invalid(format!(
                "organization '{organization}' is not a valid host label"
            )));
        }
        if path.is_empty() {
            return Err(invalid("project names no repository path".to_string()));
        }

        let mut url = Url::parse(&format!("https://{host}")).map_err(|e| invalid(e.to_string()))?;
        url.set_path(path);

        RepositoryUrl::parse(url.as_str()).map_err(|e| invalid(e.to_string()))
    }
}

impl Default for CloudForgeAdapter {
    fn default() -> Self {
        Self::new(&CloudForgeConfig::default())
    }
}

impl ProviderAdapter for CloudForgeAdapter {
    fn name(&self) -> &ProviderName {
        &self.name
    }

    fn url_name(&self) -> &str {
        "cloudforge-webhook"
    }

    fn extract_affected_paths(
        &self,
        params: &RequestParams,
    ) -> Result<AffectedPaths, MalformedInputError> {
        svn::affected_paths(params)
    }

    fn extract_revision(&self, params: &RequestParams) -> Revision {
        svn::revision(params)
    }

    fn build_match_predicate(
        &self,
        params: &RequestParams,
    ) -> Result<RepositoryMatcher, UnresolvableIdentityError> {
        let root = required(params, PARAM_ORGANIZATION).and_then(|organization| {
            let project = required(params, PARAM_PROJECT)?;
            self.repository_root(organization, project)
        });

        match root {
            Ok(root) => Ok(RepositoryMatcher::new(root)),
            Err(e) => {
                warn!(
                    provider = %self.name,
                    error = %e,
                    "Failed to handle Subversion commit notification"
                );
                Err(e)
            }
        }
    }
}

fn required<'a>(
    params: &'a RequestParams,
    name: &str,
) -> Result<&'a str, UnresolvableIdentityError> {
    params
        .get_non_blank(name)
        .ok_or_else(|| UnresolvableIdentityError::MissingParameter {
            parameter: name.to_string(),
        })
}

fn is_host_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

//! Subversion-style webhook fields shared by every Subversion provider, and
//! the generic adapter for senders that post the repository URL directly.
//!
//! Subversion post-commit hooks conventionally report the changed paths as
//! `changed` (one path per line, as printed by `svnlook changed`) and the new
//! head revision as `youngest` (as printed by `svnlook youngest`).

use dispatch::{
    AffectedPaths, MalformedInputError, ProviderName, RepositoryMatcher, RepositoryUrl, Revision,
    UnresolvableIdentityError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{ProviderAdapter, RequestParams};

/// Parameter carrying newline-separated changed paths.
pub const PARAM_CHANGED: &str = "changed";
/// Parameter carrying the decimal head revision.
pub const PARAM_YOUNGEST: &str = "youngest";
/// Parameter carrying the repository root URL (generic adapter only).
pub const PARAM_REPOSITORY: &str = "repository";

/// Reads the `changed` parameter.
///
/// Lines are split on `\n`, a trailing `\r` is stripped and blank lines are
/// dropped, so `"/somepath\n"` yields exactly `{"/somepath"}`.
///
/// # Errors
///
/// [`MalformedInputError`] when `changed` is absent.
pub fn affected_paths(params: &RequestParams) -> Result<AffectedPaths, MalformedInputError> {
    let changed = params
        .get(PARAM_CHANGED)
        .ok_or_else(|| MalformedInputError::missing(PARAM_CHANGED))?;

    Ok(changed
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect())
}

/// Reads the `youngest` parameter; unknown when absent or not a number.
pub fn revision(params: &RequestParams) -> Revision {
    let Some(raw) = params.get(PARAM_YOUNGEST) else {
        return Revision::UNKNOWN;
    };

    match raw.trim().parse::<i64>() {
        Ok(number) => Revision::from(number),
        Err(e) => {
            info!(revision = raw, error = %e, "Ignoring bad revision");
            Revision::UNKNOWN
        }
    }
}

// ---------------------------------------------------------------------------
// Generic adapter
// ---------------------------------------------------------------------------

/// Settings for the generic Subversion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvnConfig {
    /// Whether `/svn-webhook` is exposed.
    pub enabled: bool,
}

impl Default for SvnConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Adapter for senders that post the repository root URL in `repository`.
#[derive(Debug, Clone)]
pub struct SvnAdapter {
    name: ProviderName,
}

impl SvnAdapter {
    pub fn new() -> Self {
        Self {
            name: ProviderName::from_static("svn"),
        }
    }
}

impl Default for SvnAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for SvnAdapter {
    fn name(&self) -> &ProviderName {
        &self.name
    }

    fn url_name(&self) -> &str {
        "svn-webhook"
    }

    fn extract_affected_paths(
        &self,
        params: &RequestParams,
    ) -> Result<AffectedPaths, MalformedInputError> {
        affected_paths(params)
    }

    fn extract_revision(&self, params: &RequestParams) -> Revision {
        revision(params)
    }

    fn build_match_predicate(
        &self,
        params: &RequestParams,
    ) -> Result<RepositoryMatcher, UnresolvableIdentityError> {
        let Some(raw) = params.get_non_blank(PARAM_REPOSITORY) else {
            warn!(provider = %self.name, "Notification carries no repository URL");
            return Err(UnresolvableIdentityError::MissingParameter {
                parameter: PARAM_REPOSITORY.to_string(),
            });
        };

        RepositoryUrl::parse(raw)
            .map(RepositoryMatcher::new)
            .map_err(|e| {
                warn!(
                    provider = %self.name,
                    repository = raw,
                    error = %e,
                    "Failed to handle Subversion commit notification"
                );
                UnresolvableIdentityError::InvalidIdentity {
                    candidate: raw.to_string(),
                    reason: e.to_string(),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RequestParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn trailing_newline_yields_single_path() {
        let paths = affected_paths(&params(&[("changed", "/somepath\n")])).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths.contains("/somepath"));
    }

    #[test]
    fn crlf_lines_are_trimmed() {
        let paths = affected_paths(&params(&[("changed", "/a\r\n/b\r\n")])).unwrap();
        assert_eq!(paths.iter().collect::<Vec<_>>(), vec!["/a", "/b"]);
    }

    #[test]
    fn empty_changed_is_valid_and_unknown() {
        let paths = affected_paths(&params(&[("changed", "")])).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn missing_changed_is_malformed() {
        let err = affected_paths(&params(&[("youngest", "3")])).unwrap_err();
        assert_eq!(err, MalformedInputError::missing("changed"));
    }

    #[test]
    fn revision_parses_decimal() {
        assert_eq!(revision(&params(&[("youngest", "0")])), Revision::new(0));
        assert_eq!(revision(&params(&[("youngest", " 1234 ")])), Revision::new(1234));
    }

    #[test]
    fn bad_or_missing_revision_is_unknown() {
        assert_eq!(revision(&params(&[("youngest", "not-a-number")])), Revision::UNKNOWN);
        assert_eq!(revision(&params(&[("youngest", "")])), Revision::UNKNOWN);
        assert_eq!(revision(&params(&[("youngest", "-5")])), Revision::UNKNOWN);
        assert_eq!(revision(&params(&[])), Revision::UNKNOWN);
    }

    #[test]
    fn generic_adapter_uses_repository_parameter() {
        let adapter = SvnAdapter::new();
        let matcher = adapter
            .build_match_predicate(&params(&[("repository", "https://svn.example.org/repos/app/")]))
            .unwrap();
        assert_eq!(matcher.root().as_str(), "https://svn.example.org/repos/app");
    }

    #[test]
    fn generic_adapter_without_repository_is_unresolvable() {
        let adapter = SvnAdapter::new();
        let err = adapter.build_match_predicate(&params(&[])).unwrap_err();
        assert!(matches!(err, UnresolvableIdentityError::MissingParameter { .. }));
    }

    #[test]
    fn generic_adapter_with_garbage_repository_is_unresolvable() {
        let adapter = SvnAdapter::new();
        let err = adapter
            .build_match_predicate(&params(&[("repository", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, UnresolvableIdentityError::InvalidIdentity { .. }));
    }
}

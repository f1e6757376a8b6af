//! Shared value types for notifications.
//!
//! Unlike the identifiers in [`crate::identifiers`], these types carry values
//! with invariants: a [`Revision`] is either a non-negative number or unknown,
//! and a [`RepositoryUrl`] is always in canonical form.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::PredicateEvaluationError;

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// A repository revision number as reported by the hosting provider.
///
/// Revisions are non-negative. Any negative input collapses to the single
/// "unknown" value, which renders as `-1` on the wire and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct Revision(Option<u64>);

impl Revision {
    /// The unknown revision.
    pub const UNKNOWN: Revision = Revision(None);

    /// Creates a known revision.
    pub fn new(number: u64) -> Self {
        Self(Some(number))
    }

    /// Returns the revision number, or `None` when unknown.
    pub fn number(self) -> Option<u64> {
        self.0
    }

    /// Returns `true` if the provider supplied a usable revision.
    pub fn is_known(self) -> bool {
        self.0.is_some()
    }

    /// Returns the revision as a signed integer, `-1` when unknown.
    pub fn as_i64(self) -> i64 {
        self.0
            .and_then(|n| i64::try_from(n).ok())
            .unwrap_or(-1)
    }
}

impl Default for Revision {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl From<i64> for Revision {
    fn from(value: i64) -> Self {
        u64::try_from(value).map_or(Self::UNKNOWN, Self::new)
    }
}

impl From<Revision> for i64 {
    fn from(value: Revision) -> Self {
        value.as_i64()
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

// ---------------------------------------------------------------------------
// Affected paths
// ---------------------------------------------------------------------------

/// The set of repository paths touched by the notified commit.
///
/// An empty set means the provider did not say which paths changed; it does
/// NOT mean nothing changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffectedPaths(BTreeSet<String>);

impl AffectedPaths {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no paths are known.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of distinct paths.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if `path` is in the set.
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    /// Iterates the paths in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for AffectedPaths {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// Repository identity
// ---------------------------------------------------------------------------

/// Canonical identity of a source-control repository root.
///
/// The host is lower-cased by URL parsing and a trailing `/` on the path is
/// dropped, so `https://Org.svn.example.com/test/` and
/// `https://org.svn.example.com/test` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryUrl(Url);

impl RepositoryUrl {
    /// Parses and canonicalises a repository root URL.
    ///
    /// Fails for strings that are not absolute URLs or that carry no host.
    pub fn parse(raw: &str) -> Result<Self, PredicateEvaluationError> {
        let mut url = Url::parse(raw.trim()).map_err(|e| {
            PredicateEvaluationError::MalformedRepositoryUrl {
                url: raw.to_string(),
                reason: e.to_string(),
            }
        })?;

        if url.host_str().is_none() {
            return Err(PredicateEvaluationError::MalformedRepositoryUrl {
                url: raw.to_string(),
                reason: "URL has no host".to_string(),
            });
        }

        url.set_query(None);
        url.set_fragment(None);
        let trimmed = url.path().trim_end_matches('/').to_string();
        url.set_path(&trimmed);

        Ok(Self(url))
    }

    /// Returns the canonical URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the canonical URL as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for RepositoryUrl {
    type Error = PredicateEvaluationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepositoryUrl> for String {
    fn from(value: RepositoryUrl) -> Self {
        value.0.into()
    }
}

impl std::fmt::Display for RepositoryUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_revisions_are_unknown() {
        assert_eq!(Revision::from(-1), Revision::UNKNOWN);
        assert_eq!(Revision::from(-42), Revision::UNKNOWN);
        assert_eq!(Revision::UNKNOWN.as_i64(), -1);
        assert!(!Revision::UNKNOWN.is_known());
    }

    #[test]
    fn zero_is_a_known_revision() {
        let rev = Revision::from(0);
        assert!(rev.is_known());
        assert_eq!(rev.number(), Some(0));
        assert_eq!(rev.to_string(), "0");
    }

    #[test]
    fn revision_converts_to_wire_integer() {
        assert_eq!(i64::from(Revision::UNKNOWN), -1);
        assert_eq!(i64::from(Revision::new(17)), 17);
    }

    #[test]
    fn affected_paths_deduplicate() {
        let paths: AffectedPaths = ["/a", "/b", "/a"].into_iter().collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains("/a"));
        assert_eq!(paths.iter().collect::<Vec<_>>(), vec!["/a", "/b"]);
    }

    #[test]
    fn repository_urls_ignore_host_case_and_trailing_slash() {
        let a = RepositoryUrl::parse("https://Testing.SVN.cloudforge.com/test/").unwrap();
        let b = RepositoryUrl::parse("https://testing.svn.cloudforge.com/test").unwrap();
        assert_eq!(a, b);
        assert_eq!(b.as_str(), "https://testing.svn.cloudforge.com/test");
    }

    #[test]
    fn repository_urls_distinguish_paths() {
        let a = RepositoryUrl::parse("https://testing.svn.cloudforge.com/test").unwrap();
        let b = RepositoryUrl::parse("https://testing.svn.cloudforge.com/other").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn repository_urls_require_a_host() {
        assert!(RepositoryUrl::parse("not a url").is_err());
        assert!(RepositoryUrl::parse("file:///var/svn/repo").is_err());
    }
}

//! Newtype domain identifiers.
//!
//! Every concept with an identity is a distinct newtype wrapping a primitive,
//! so a [`JobName`] can never be passed where a [`ProviderName`] is expected
//! even though both are strings underneath.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is blank.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Creates an identifier from a compile-time constant.
            ///
            /// The caller guarantees the value is not blank.
            pub fn from_static(value: &'static str) -> Self {
                debug_assert!(!value.trim().is_empty(), "identifier must not be blank");
                Self(value.to_string())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one inbound notification.
///
/// Generated fresh for every HTTP call; recorded on the request span and
/// carried inside every [`crate::Cause`] so a poll can be traced back to the
/// delivery that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Generates a new random notification identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`NotificationId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed (configuration names)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a configured build job by its unique name.
    JobName
}

string_id! {
    /// Identifies the hosting provider a notification came from
    /// (e.g. `"cloudforge"`).
    ProviderName
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert!(JobName::new("").is_none());
        assert!(JobName::new("   ").is_none());
        assert!(ProviderName::new("\t").is_none());
    }

    #[test]
    fn names_display_their_value() {
        let name = JobName::new("nightly").unwrap();
        assert_eq!(name.to_string(), "nightly");
        assert_eq!(name.as_str(), "nightly");
    }

    #[test]
    fn random_notification_ids_differ() {
        assert_ne!(NotificationId::new_random(), NotificationId::new_random());
    }
}

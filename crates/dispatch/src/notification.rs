//! Inbound notifications and the causes handed to triggered polls.

use serde::{Deserialize, Serialize};

use crate::{AffectedPaths, NotificationId, ProviderName, Revision, Timestamp};

/// One parsed push notification.
///
/// Created once per inbound HTTP call by the listener after the provider
/// adapter has extracted the affected paths and revision; dropped once
/// dispatch completes. Provider-specific identity fields never reach this
/// type; they are consumed by the adapter when it builds the match predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    provider: ProviderName,
    affected_paths: AffectedPaths,
    revision: Revision,
    received_at: Timestamp,
}

impl Notification {
    /// Creates a notification received now, with a fresh identifier.
    pub fn new(provider: ProviderName, affected_paths: AffectedPaths, revision: Revision) -> Self {
        Self::with_id(NotificationId::new_random(), provider, affected_paths, revision)
    }

    /// Creates a notification with a caller-supplied identifier.
    ///
    /// The listener uses this so the identifier already recorded on the
    /// request span is the one carried into every cause.
    pub fn with_id(
        id: NotificationId,
        provider: ProviderName,
        affected_paths: AffectedPaths,
        revision: Revision,
    ) -> Self {
        Self {
            id,
            provider,
            affected_paths,
            revision,
            received_at: Timestamp::now(),
        }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn provider(&self) -> &ProviderName {
        &self.provider
    }

    pub fn affected_paths(&self) -> &AffectedPaths {
        &self.affected_paths
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn received_at(&self) -> Timestamp {
        self.received_at
    }

    /// Builds the cause recorded against every poll this notification triggers.
    pub fn cause(&self) -> Cause {
        Cause {
            provider: self.provider.clone(),
            notification_id: self.id,
            affected_paths: self.affected_paths.clone(),
            revision: self.revision,
            received_at: self.received_at,
        }
    }
}

/// Why a poll was triggered.
///
/// Passed to [`crate::Trigger::run`] and forwarded by the trigger to whatever
/// performs the poll, so the poll can log and expose the revision and paths
/// that prompted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    /// Provider whose webhook delivered the notification.
    pub provider: ProviderName,
    /// Notification the poll traces back to.
    pub notification_id: NotificationId,
    /// Paths reported as changed; empty when unknown.
    pub affected_paths: AffectedPaths,
    /// Reported revision; unknown when the provider sent none or garbage.
    pub revision: Revision,
    /// When the notification arrived.
    pub received_at: Timestamp,
}

impl std::fmt::Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Triggered by push notification from {}", self.provider)?;
        if self.revision.is_known() {
            write!(f, " for revision {}", self.revision)?;
        }
        Ok(())
    }
}

//! Job configuration as read from the `[[jobs]]` tables of the config file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_QUEUE_CAPACITY: usize = 256;
const DEFAULT_MAX_CONCURRENT_POLLS: usize = 4;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300;

/// One configured build job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Unique job name.
    pub name: String,

    /// Paused jobs are never polled by notifications.
    #[serde(default)]
    pub disabled: bool,

    /// Subversion modules the job checks out.
    #[serde(default)]
    pub locations: Vec<LocationConfig>,

    /// How to poll the job. A job without this table has no polling trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollCommandConfig>,
}

/// One Subversion module of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationConfig {
    /// Module URL, usually pointing inside the repository.
    pub remote: String,

    /// Checkout directory; defaults to the last path segment of `remote`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,

    /// Canonical repository root. Without it the location never matches a
    /// notification and every evaluation is logged as a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_root: Option<String>,
}

impl LocationConfig {
    /// The configured checkout directory, or the remote's last path segment.
    pub fn local_dir(&self) -> String {
        if let Some(local) = &self.local {
            return local.clone();
        }
        self.remote
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty() && !segment.contains(':'))
            .unwrap_or(".")
            .to_string()
    }
}

/// Command run for each poll of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollCommandConfig {
    /// Program and arguments, e.g. `["svn", "update", "/srv/build/app"]`.
    pub command: Vec<String>,

    /// Directory the command runs in; inherits the daemon's when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Seconds before a running poll is killed.
    #[serde(default = "default_poll_timeout_secs")]
    pub timeout_secs: u64,
}

impl PollCommandConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_poll_timeout_secs() -> u64 {
    DEFAULT_POLL_TIMEOUT_SECS
}

/// Sizing of the poll queue and worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    /// Polls that may wait in the queue; further triggers fail with
    /// `QueueFull` until the worker catches up.
    pub queue_capacity: usize,

    /// Polls the worker runs at the same time.
    pub max_concurrent_polls: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_concurrent_polls: DEFAULT_MAX_CONCURRENT_POLLS,
        }
    }
}

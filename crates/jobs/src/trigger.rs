//! Queue-backed polling trigger.
//!
//! [`PollTrigger::run`] never blocks: it places one [`PollRequest`] on a
//! bounded channel with `try_send` and returns. The [`crate::PollWorker`] at
//! the other end performs the poll.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dispatch::{AffectedPaths, Cause, JobName, Revision, Trigger, TriggerInvocationError};
use tokio::sync::mpsc;

use crate::config::PollCommandConfig;

/// The command that performs one job's poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl PollCommand {
    /// Builds a command from configuration; `None` if `command` is empty.
    pub fn from_config(config: &PollCommandConfig) -> Option<Self> {
        let (program, args) = config.command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: config.working_dir.clone(),
            timeout: config.timeout(),
        })
    }
}

/// One poll waiting for the worker.
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub job: JobName,
    pub command: Arc<PollCommand>,
    pub causes: Vec<Cause>,
}

impl PollRequest {
    /// The highest known revision among the causes, or unknown.
    pub fn revision(&self) -> Revision {
        self.causes
            .iter()
            .filter_map(|c| c.revision.number())
            .max()
            .map_or(Revision::UNKNOWN, Revision::new)
    }

    /// Every path reported by any cause.
    pub fn affected_paths(&self) -> AffectedPaths {
        self.causes
            .iter()
            .flat_map(|c| c.affected_paths.iter())
            .collect()
    }
}

/// Sending half of the poll queue, shared by every job's trigger.
#[derive(Debug, Clone)]
pub struct PollQueue {
    sender: mpsc::Sender<PollRequest>,
}

/// Creates a poll queue holding at most `capacity` waiting polls.
///
/// A capacity of zero is raised to one.
pub fn poll_queue(capacity: usize) -> (PollQueue, mpsc::Receiver<PollRequest>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (PollQueue { sender }, receiver)
}

/// A job's polling trigger.
#[derive(Debug, Clone)]
pub struct PollTrigger {
    job: JobName,
    command: Arc<PollCommand>,
    queue: PollQueue,
}

impl PollTrigger {
    pub fn new(job: JobName, command: PollCommand, queue: PollQueue) -> Self {
        Self {
            job,
            command: Arc::new(command),
            queue,
        }
    }

    pub fn command(&self) -> &PollCommand {
        &self.command
    }
}

impl Trigger for PollTrigger {
    fn run(&self, causes: &[Cause]) -> Result<(), TriggerInvocationError> {
        let request = PollRequest {
            job: self.job.clone(),
            command: Arc::clone(&self.command),
            causes: causes.to_vec(),
        };

        self.queue.sender.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TriggerInvocationError::QueueFull {
                job: self.job.clone(),
            },
            mpsc::error::TrySendError::Closed(_) => TriggerInvocationError::QueueClosed {
                job: self.job.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch::{Notification, ProviderName};

    fn command() -> PollCommand {
        PollCommand {
            program: "true".to_string(),
            args: Vec::new(),
            working_dir: None,
            timeout: Duration::from_secs(5),
        }
    }

    fn cause(revision: Revision, paths: &[&str]) -> Cause {
        Notification::new(
            ProviderName::new("cloudforge").unwrap(),
            paths.iter().copied().collect(),
            revision,
        )
        .cause()
    }

    #[test]
    fn run_enqueues_one_request() {
        let (queue, mut receiver) = poll_queue(4);
        let trigger = PollTrigger::new(JobName::new("app").unwrap(), command(), queue);

        trigger.run(&[cause(Revision::new(3), &["/a"])]).unwrap();

        let request = receiver.try_recv().unwrap();
        assert_eq!(request.job.as_str(), "app");
        assert_eq!(request.revision(), Revision::new(3));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn full_queue_is_reported() {
        let (queue, _receiver) = poll_queue(1);
        let trigger = PollTrigger::new(JobName::new("app").unwrap(), command(), queue);

        trigger.run(&[]).unwrap();
        let err = trigger.run(&[]).unwrap_err();

        assert!(matches!(err, TriggerInvocationError::QueueFull { .. }));
    }

    #[test]
    fn closed_queue_is_reported() {
        let (queue, receiver) = poll_queue(1);
        drop(receiver);
        let trigger = PollTrigger::new(JobName::new("app").unwrap(), command(), queue);

        let err = trigger.run(&[]).unwrap_err();

        assert!(matches!(err, TriggerInvocationError::QueueClosed { .. }));
    }

    #[test]
    fn request_merges_causes() {
        let request = PollRequest {
            job: JobName::new("app").unwrap(),
            command: Arc::new(command()),
            causes: vec![
                cause(Revision::new(3), &["/a"]),
                cause(Revision::UNKNOWN, &["/b"]),
                cause(Revision::new(9), &["/a", "/c"]),
            ],
        };

        assert_eq!(request.revision(), Revision::new(9));
        assert_eq!(
            request.affected_paths().iter().collect::<Vec<_>>(),
            vec!["/a", "/b", "/c"]
        );
    }

    #[test]
    fn request_without_causes_has_unknown_revision() {
        let request = PollRequest {
            job: JobName::new("app").unwrap(),
            command: Arc::new(command()),
            causes: Vec::new(),
        };
        assert_eq!(request.revision(), Revision::UNKNOWN);
        assert!(request.affected_paths().is_empty());
    }

    #[test]
    fn empty_command_is_rejected() {
        let config = PollCommandConfig {
            command: Vec::new(),
            working_dir: None,
            timeout_secs: 1,
        };
        assert!(PollCommand::from_config(&config).is_none());
    }
}

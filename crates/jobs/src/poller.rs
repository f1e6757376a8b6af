//! The poll itself: what happens once a queued request reaches the worker.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dispatch::JobName;
use thiserror::Error;
use tokio::process::Command;

use crate::trigger::PollRequest;

/// Environment variable carrying the job name.
pub const ENV_JOB: &str = "POLLHOOK_JOB";
/// Environment variable carrying the revision, `-1` when unknown.
pub const ENV_REVISION: &str = "POLLHOOK_REVISION";
/// Environment variable carrying the affected paths, one per line.
pub const ENV_CHANGED: &str = "POLLHOOK_CHANGED";
/// Environment variable carrying the causes as a JSON array.
pub const ENV_CAUSES: &str = "POLLHOOK_CAUSES";

/// A poll that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl PollOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A poll that could not run or did not finish.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Failed to start poll command '{program}' for job '{job}': {source}")]
    Spawn {
        job: JobName,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Poll of job '{job}' did not finish within {timeout:?}")]
    TimedOut { job: JobName, timeout: Duration },

    #[error("Failed to encode poll causes for job '{job}': {source}")]
    Encode {
        job: JobName,
        #[source]
        source: serde_json::Error,
    },
}

/// Performs polls handed over by the worker.
#[async_trait]
pub trait Poller: Send + Sync {
    /// Polls the job named in `request`.
    ///
    /// # Errors
    ///
    /// [`PollError`] when the poll could not be carried out.
    async fn poll(&self, request: PollRequest) -> Result<PollOutcome, PollError>;
}

/// Runs each job's configured command as a child process.
///
/// The command sees the notification through the `POLLHOOK_*` variables;
/// its output is discarded. A poll that outlives its timeout is killed.
#[derive(Debug, Clone, Default)]
pub struct CommandPoller;

impl CommandPoller {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Poller for CommandPoller {
    async fn poll(&self, request: PollRequest) -> Result<PollOutcome, PollError> {
        let causes = serde_json::to_string(&request.causes).map_err(|source| PollError::Encode {
            job: request.job.clone(),
            source,
        })?;
        let changed = request
            .affected_paths()
            .iter()
            .collect::<Vec<_>>()
            .join("\n");

        let spec = &request.command;
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .env(ENV_JOB, request.job.as_str())
            .env(ENV_REVISION, request.revision().as_i64().to_string())
            .env(ENV_CHANGED, changed)
            .env(ENV_CAUSES, causes)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| PollError::Spawn {
            job: request.job.clone(),
            program: spec.program.clone(),
            source,
        })?;

        let status = match tokio::time::timeout(spec.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(source)) => {
                return Err(PollError::Spawn {
                    job: request.job.clone(),
                    program: spec.program.clone(),
                    source,
                })
            }
            Err(_) => {
                // kill_on_drop reaps the child when it goes out of scope
                return Err(PollError::TimedOut {
                    job: request.job.clone(),
                    timeout: spec.timeout,
                });
            }
        };

        Ok(PollOutcome {
            exit_code: status.code(),
            duration: started.elapsed(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::trigger::PollCommand;
    use dispatch::{Notification, ProviderName, Revision};
    use std::sync::Arc;

    fn request(args: &[&str], timeout: Duration) -> PollRequest {
        let notification = Notification::new(
            ProviderName::new("cloudforge").unwrap(),
            ["/somepath", "/other"].into_iter().collect(),
            Revision::new(42),
        );
        PollRequest {
            job: JobName::new("app").unwrap(),
            command: Arc::new(PollCommand {
                program: "sh".to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                working_dir: None,
                timeout,
            }),
            causes: vec![notification.cause()],
        }
    }

    #[tokio::test]
    async fn command_sees_notification_environment() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("env.txt");
        let script = format!(
            "printf '%s|%s|%s' \"$POLLHOOK_JOB\" \"$POLLHOOK_REVISION\" \"$POLLHOOK_CHANGED\" > '{}'",
            out.display()
        );

        let outcome = CommandPoller::new()
            .poll(request(&["-c", &script], Duration::from_secs(10)))
            .await
            .unwrap();

        assert!(outcome.success());
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written, "app|42|/other\n/somepath");
    }

    #[tokio::test]
    async fn causes_are_passed_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("causes.json");
        let script = format!("printf '%s' \"$POLLHOOK_CAUSES\" > '{}'", out.display());

        CommandPoller::new()
            .poll(request(&["-c", &script], Duration::from_secs(10)))
            .await
            .unwrap();

        let causes: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(causes[0]["provider"], "cloudforge");
        assert_eq!(causes[0]["revision"], 42);
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_not_failed() {
        let outcome = CommandPoller::new()
            .poll(request(&["-c", "exit 3"], Duration::from_secs(10)))
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, Some(3));
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let err = CommandPoller::new()
            .poll(request(&["-c", "sleep 5"], Duration::from_millis(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let mut req = request(&[], Duration::from_secs(1));
        req.command = Arc::new(PollCommand {
            program: "/nonexistent/pollhook-test-binary".to_string(),
            args: Vec::new(),
            working_dir: None,
            timeout: Duration::from_secs(1),
        });

        let err = CommandPoller::new().poll(req).await.unwrap_err();

        assert!(matches!(err, PollError::Spawn { .. }));
    }
}

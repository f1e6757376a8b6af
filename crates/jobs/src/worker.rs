//! Drains the poll queue.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn, Instrument};

use crate::poller::Poller;
use crate::trigger::PollRequest;

/// Runs queued polls, at most `max_concurrent` at a time.
///
/// [`run`](Self::run) returns once every [`crate::PollQueue`] handle has been
/// dropped, the queue is empty and all started polls have finished.
pub struct PollWorker {
    receiver: mpsc::Receiver<PollRequest>,
    poller: Arc<dyn Poller>,
    max_concurrent: usize,
}

impl PollWorker {
    pub fn new(
        receiver: mpsc::Receiver<PollRequest>,
        poller: Arc<dyn Poller>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            receiver,
            poller,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub async fn run(mut self) {
        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut running = JoinSet::new();

        info!(max_concurrent = self.max_concurrent, "Poll worker started");

        while let Some(request) = self.receiver.recv().await {
            // Reap finished polls so the set does not grow without bound.
            while let Some(joined) = running.try_join_next() {
                log_join_error(joined);
            }

            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let poller = Arc::clone(&self.poller);
            let span = tracing::info_span!(
                "poll",
                job = %request.job,
                revision = %request.revision(),
            );

            running.spawn(
                async move {
                    let _permit = permit;
                    let job = request.job.clone();
                    match poller.poll(request).await {
                        Ok(outcome) if outcome.success() => {
                            info!(
                                duration_ms = outcome.duration.as_millis() as u64,
                                "Poll finished"
                            );
                        }
                        Ok(outcome) => {
                            warn!(
                                job = %job,
                                exit_code = ?outcome.exit_code,
                                duration_ms = outcome.duration.as_millis() as u64,
                                "Poll command failed"
                            );
                        }
                        Err(e) => {
                            warn!(job = %job, error = %e, "Poll could not be carried out");
                        }
                    }
                }
                .instrument(span),
            );
        }

        while let Some(joined) = running.join_next().await {
            log_join_error(joined);
        }

        info!("Poll worker stopped");
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Poll task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::{PollError, PollOutcome};
    use crate::trigger::{poll_queue, PollCommand, PollTrigger};
    use async_trait::async_trait;
    use dispatch::{JobName, Trigger};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingPoller {
        polled: Mutex<Vec<String>>,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Poller for CountingPoller {
        async fn poll(&self, request: PollRequest) -> Result<PollOutcome, PollError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.polled
                .lock()
                .unwrap()
                .push(request.job.as_str().to_string());
            Ok(PollOutcome {
                exit_code: Some(0),
                duration: Duration::from_millis(20),
            })
        }
    }

    fn trigger(name: &str, queue: &crate::PollQueue) -> PollTrigger {
        PollTrigger::new(
            JobName::new(name).unwrap(),
            PollCommand {
                program: "true".to_string(),
                args: Vec::new(),
                working_dir: None,
                timeout: Duration::from_secs(1),
            },
            queue.clone(),
        )
    }

    #[tokio::test]
    async fn drains_queue_then_stops_when_senders_drop() {
        let (queue, receiver) = poll_queue(16);
        let poller = Arc::new(CountingPoller::default());
        let worker = PollWorker::new(receiver, poller.clone(), 2);

        for name in ["a", "b", "c", "d", "e"] {
            trigger(name, &queue).run(&[]).unwrap();
        }
        drop(queue);

        tokio::time::timeout(Duration::from_secs(5), worker.run())
            .await
            .unwrap();

        let mut polled = poller.polled.lock().unwrap().clone();
        polled.sort();
        assert_eq!(polled, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn respects_concurrency_limit() {
        let (queue, receiver) = poll_queue(16);
        let poller = Arc::new(CountingPoller::default());
        let worker = PollWorker::new(receiver, poller.clone(), 2);

        for i in 0..8 {
            trigger(&format!("job-{i}"), &queue).run(&[]).unwrap();
        }
        drop(queue);
        worker.run().await;

        assert!(poller.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(poller.polled.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn poll_errors_do_not_stop_the_worker() {
        struct FailingPoller;

        #[async_trait]
        impl Poller for FailingPoller {
            async fn poll(&self, request: PollRequest) -> Result<PollOutcome, PollError> {
                Err(PollError::TimedOut {
                    job: request.job,
                    timeout: Duration::from_secs(0),
                })
            }
        }

        let (queue, receiver) = poll_queue(4);
        trigger("a", &queue).run(&[]).unwrap();
        trigger("b", &queue).run(&[]).unwrap();
        drop(queue);

        tokio::time::timeout(
            Duration::from_secs(5),
            PollWorker::new(receiver, Arc::new(FailingPoller), 1).run(),
        )
        .await
        .unwrap();
    }
}

//! pollhook job orchestration.
//!
//! This crate supplies the job side of the [`dispatch`] ports:
//!
//! - [`StaticJobRegistry`] serves the jobs built from `[[jobs]]` config tables.
//! - [`PollTrigger`] is each job's polling trigger. It only enqueues a
//!   [`PollRequest`], so dispatch never waits on a poll.
//! - [`PollWorker`] drains the queue with bounded concurrency and hands each
//!   request to a [`Poller`], by default the [`CommandPoller`].
//!
//! ```text
//! dispatcher ──run()──▶ PollTrigger ──try_send──▶ [queue] ──▶ PollWorker ──▶ Poller
//! ```
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Jobs sequence configuration and infrastructure
//! (the queue, child processes). Matching rules stay in [`dispatch`].

pub mod config;
pub mod poller;
pub mod registry;
pub mod trigger;
pub mod worker;

pub use config::{JobConfig, LocationConfig, PollCommandConfig, PollSettings};
pub use poller::{CommandPoller, PollError, PollOutcome, Poller};
pub use registry::{build_jobs, ConfiguredJob, JobConfigError, StaticJobRegistry};
pub use trigger::{poll_queue, PollCommand, PollQueue, PollRequest, PollTrigger};
pub use worker::PollWorker;

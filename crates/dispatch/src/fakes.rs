//! In-memory fakes for the port traits (testing only).
//!
//! Provides [`FakeJob`], [`RecordingTrigger`] and [`InMemoryJobRegistry`],
//! which satisfy the port contracts without any configuration or I/O.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::{LocationLookupError, TriggerInvocationError};
use crate::ports::{Job, JobRegistry, Trigger};
use crate::{Cause, JobName, ModuleLocation};

// ---------------------------------------------------------------------------
// RecordingTrigger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerBehaviour {
    Record,
    Fail,
    Panic,
}

/// Trigger that records every call. Clones share the same record.
#[derive(Debug, Clone)]
pub struct RecordingTrigger {
    behaviour: TriggerBehaviour,
    calls: Arc<Mutex<Vec<Vec<Cause>>>>,
}

impl RecordingTrigger {
    /// A trigger whose `run` succeeds.
    pub fn new() -> Self {
        Self::with_behaviour(TriggerBehaviour::Record)
    }

    /// A trigger whose `run` records the call and then fails.
    pub fn failing() -> Self {
        Self::with_behaviour(TriggerBehaviour::Fail)
    }

    /// A trigger whose `run` records the call and then panics.
    pub fn panicking() -> Self {
        Self::with_behaviour(TriggerBehaviour::Panic)
    }

    fn with_behaviour(behaviour: TriggerBehaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The causes passed to each call, oldest first.
    pub fn calls(&self) -> Vec<Vec<Cause>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for RecordingTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Trigger for RecordingTrigger {
    fn run(&self, causes: &[Cause]) -> Result<(), TriggerInvocationError> {
        self.calls.lock().unwrap().push(causes.to_vec());
        match self.behaviour {
            TriggerBehaviour::Record => Ok(()),
            TriggerBehaviour::Fail => Err(TriggerInvocationError::Failed {
                job: JobName::from_static("unknown"),
                reason: "recording trigger configured to fail".to_string(),
            }),
            TriggerBehaviour::Panic => panic!("trigger exploded"),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeJob
// ---------------------------------------------------------------------------

/// Builder-style job with fixed locations and an optional trigger.
pub struct FakeJob {
    name: JobName,
    disabled: bool,
    locations: Result<Vec<ModuleLocation>, String>,
    trigger: Option<Arc<dyn Trigger>>,
}

impl FakeJob {
    /// An enabled job with no locations and no trigger.
    ///
    /// # Panics
    ///
    /// If `name` is blank.
    pub fn new(name: &str) -> Self {
        Self {
            name: JobName::new(name).expect("fake job name must not be blank"),
            disabled: false,
            locations: Ok(Vec::new()),
            trigger: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn with_location(mut self, location: ModuleLocation) -> Self {
        if let Ok(locations) = &mut self.locations {
            locations.push(location);
        }
        self
    }

    /// Makes [`Job::source_control_locations`] fail with `reason`.
    pub fn with_broken_locations(mut self, reason: &str) -> Self {
        self.locations = Err(reason.to_string());
        self
    }

    pub fn with_trigger(mut self, trigger: impl Trigger + 'static) -> Self {
        self.trigger = Some(Arc::new(trigger));
        self
    }

    pub fn into_arc(self) -> Arc<dyn Job> {
        Arc::new(self)
    }
}

impl Job for FakeJob {
    fn name(&self) -> &JobName {
        &self.name
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn source_control_locations(&self) -> Result<Vec<ModuleLocation>, LocationLookupError> {
        self.locations.clone().map_err(|reason| LocationLookupError {
            job: self.name.clone(),
            reason,
        })
    }

    fn polling_trigger(&self) -> Option<Arc<dyn Trigger>> {
        self.trigger.clone()
    }
}

// ---------------------------------------------------------------------------
// InMemoryJobRegistry
// ---------------------------------------------------------------------------

/// Registry backed by a `Vec`, counting how often it is enumerated.
#[derive(Default)]
pub struct InMemoryJobRegistry {
    jobs: Mutex<Vec<Arc<dyn Job>>>,
    list_calls: AtomicUsize,
}

impl InMemoryJobRegistry {
    pub fn new(jobs: Vec<Arc<dyn Job>>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn add(&self, job: Arc<dyn Job>) {
        self.jobs.lock().unwrap().push(job);
    }

    /// How many times [`JobRegistry::list_all_jobs`] has been called.
    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl JobRegistry for InMemoryJobRegistry {
    fn list_all_jobs(&self) -> Vec<Arc<dyn Job>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().unwrap().clone()
    }
}

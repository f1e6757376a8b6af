//! Jobs built from configuration and the registry that serves them.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use dispatch::{
    Job, JobName, JobRegistry, LocationLookupError, ModuleLocation, RepositoryUrl, Trigger,
};
use thiserror::Error;
use tracing::debug;

use crate::config::JobConfig;
use crate::trigger::{PollCommand, PollQueue, PollTrigger};

/// A `[[jobs]]` table that cannot be turned into a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobConfigError {
    #[error("Job #{index} has a blank name")]
    BlankName { index: usize },

    #[error("Job '{name}' is configured more than once")]
    DuplicateName { name: String },

    #[error("Job '{name}' has a [poll] table with an empty command")]
    EmptyCommand { name: String },

    #[error("Job '{name}' has an invalid repository_root '{url}': {reason}")]
    InvalidRepositoryRoot {
        name: String,
        url: String,
        reason: String,
    },
}

/// A job read from the config file.
pub struct ConfiguredJob {
    name: JobName,
    disabled: bool,
    locations: Vec<ModuleLocation>,
    trigger: Option<Arc<dyn Trigger>>,
}

impl ConfiguredJob {
    pub fn new(
        name: JobName,
        disabled: bool,
        locations: Vec<ModuleLocation>,
        trigger: Option<Arc<dyn Trigger>>,
    ) -> Self {
        Self {
            name,
            disabled,
            locations,
            trigger,
        }
    }
}

impl std::fmt::Debug for ConfiguredJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredJob")
            .field("name", &self.name)
            .field("disabled", &self.disabled)
            .field("locations", &self.locations)
            .field("has_trigger", &self.trigger.is_some())
            .finish()
    }
}

impl Job for ConfiguredJob {
    fn name(&self) -> &JobName {
        &self.name
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn source_control_locations(&self) -> Result<Vec<ModuleLocation>, LocationLookupError> {
        Ok(self.locations.clone())
    }

    fn polling_trigger(&self) -> Option<Arc<dyn Trigger>> {
        self.trigger.clone()
    }
}

/// Builds one job per `[[jobs]]` table, with polling triggers feeding `queue`.
///
/// # Errors
///
/// [`JobConfigError`] for the first table that is invalid. No jobs are
/// returned in that case.
pub fn build_jobs(
    configs: &[JobConfig],
    queue: &PollQueue,
) -> Result<Vec<Arc<dyn Job>>, JobConfigError> {
    let mut seen = BTreeSet::new();
    let mut jobs: Vec<Arc<dyn Job>> = Vec::with_capacity(configs.len());

    for (index, config) in configs.iter().enumerate() {
        let name = JobName::new(config.name.trim()).ok_or(JobConfigError::BlankName { index })?;
        if !seen.insert(name.clone()) {
            return Err(JobConfigError::DuplicateName {
                name: name.to_string(),
            });
        }

        let mut locations = Vec::with_capacity(config.locations.len());
        for location in &config.locations {
            let module = match &location.repository_root {
                Some(raw) => {
                    let root = RepositoryUrl::parse(raw).map_err(|e| {
                        JobConfigError::InvalidRepositoryRoot {
                            name: name.to_string(),
                            url: raw.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    ModuleLocation::with_repository_root(
                        location.remote.clone(),
                        location.local_dir(),
                        root,
                    )
                }
                None => ModuleLocation::new(location.remote.clone(), location.local_dir()),
            };
            locations.push(module);
        }

        let trigger = match &config.poll {
            Some(poll) => {
                let command = PollCommand::from_config(poll).ok_or_else(|| {
                    JobConfigError::EmptyCommand {
                        name: name.to_string(),
                    }
                })?;
                let trigger: Arc<dyn Trigger> =
                    Arc::new(PollTrigger::new(name.clone(), command, queue.clone()));
                Some(trigger)
            }
            None => None,
        };

        debug!(
            job = %name,
            disabled = config.disabled,
            locations = locations.len(),
            has_trigger = trigger.is_some(),
            "Configured job"
        );

        jobs.push(Arc::new(ConfiguredJob::new(
            name,
            config.disabled,
            locations,
            trigger,
        )));
    }

    Ok(jobs)
}

/// Job registry holding a swappable snapshot of the configured jobs.
///
/// `list_all_jobs` hands out the current snapshot; [`replace`](Self::replace)
/// installs a new one without disturbing dispatches already iterating the old.
#[derive(Default)]
pub struct StaticJobRegistry {
    jobs: RwLock<Arc<Vec<Arc<dyn Job>>>>,
}

impl StaticJobRegistry {
    pub fn new(jobs: Vec<Arc<dyn Job>>) -> Self {
        Self {
            jobs: RwLock::new(Arc::new(jobs)),
        }
    }

    /// Swaps in a new set of jobs.
    pub fn replace(&self, jobs: Vec<Arc<dyn Job>>) {
        let mut guard = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(jobs);
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Arc<Vec<Arc<dyn Job>>> {
        let guard = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }
}

impl JobRegistry for StaticJobRegistry {
    fn list_all_jobs(&self) -> Vec<Arc<dyn Job>> {
        self.snapshot().to_vec()
    }
}

impl std::fmt::Debug for StaticJobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticJobRegistry")
            .field("jobs", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LocationConfig, PollCommandConfig};
    use crate::trigger::poll_queue;
    use dispatch::PredicateEvaluationError;

    fn job(name: &str) -> JobConfig {
        JobConfig {
            name: name.to_string(),
            disabled: false,
            locations: vec![LocationConfig {
                remote: "https://testing.svn.cloudforge.com/test/trunk".to_string(),
                local: None,
                repository_root: Some("https://testing.svn.cloudforge.com/test".to_string()),
            }],
            poll: Some(PollCommandConfig {
                command: vec!["svn".to_string(), "update".to_string()],
                working_dir: None,
                timeout_secs: 30,
            }),
        }
    }

    #[test]
    fn builds_jobs_from_config() {
        let (queue, _rx) = poll_queue(4);
        let jobs = build_jobs(&[job("app"), job("docs")], &queue).unwrap();

        assert_eq!(jobs.len(), 2);
        let app = &jobs[0];
        assert_eq!(app.name().as_str(), "app");
        assert!(!app.is_disabled());
        assert!(app.polling_trigger().is_some());

        let locations = app.source_control_locations().unwrap();
        assert_eq!(locations[0].local(), "trunk");
        assert_eq!(
            locations[0].repository_root().unwrap().as_str(),
            "https://testing.svn.cloudforge.com/test"
        );
    }

    #[test]
    fn job_without_poll_table_has_no_trigger() {
        let (queue, _rx) = poll_queue(4);
        let mut config = job("app");
        config.poll = None;

        let jobs = build_jobs(&[config], &queue).unwrap();

        assert!(jobs[0].polling_trigger().is_none());
    }

    #[test]
    fn location_without_root_reports_unknown_root() {
        let (queue, _rx) = poll_queue(4);
        let mut config = job("app");
        config.locations[0].repository_root = None;

        let jobs = build_jobs(&[config], &queue).unwrap();
        let locations = jobs[0].source_control_locations().unwrap();

        assert!(matches!(
            locations[0].repository_root(),
            Err(PredicateEvaluationError::UnknownRepositoryRoot { .. })
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (queue, _rx) = poll_queue(4);
        let err = build_jobs(&[job("app"), job(" app ")], &queue).err().unwrap();
        assert_eq!(
            err,
            JobConfigError::DuplicateName {
                name: "app".to_string()
            }
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        let (queue, _rx) = poll_queue(4);
        let err = build_jobs(&[job("app"), job("  ")], &queue).err().unwrap();
        assert_eq!(err, JobConfigError::BlankName { index: 1 });
    }

    #[test]
    fn empty_command_is_rejected() {
        let (queue, _rx) = poll_queue(4);
        let mut config = job("app");
        if let Some(poll) = config.poll.as_mut() {
            poll.command.clear();
        }

        let err = build_jobs(&[config], &queue).err().unwrap();

        assert!(matches!(err, JobConfigError::EmptyCommand { .. }));
    }

    #[test]
    fn invalid_repository_root_is_rejected() {
        let (queue, _rx) = poll_queue(4);
        let mut config = job("app");
        config.locations[0].repository_root = Some("not a url".to_string());

        let err = build_jobs(&[config], &queue).err().unwrap();

        assert!(matches!(err, JobConfigError::InvalidRepositoryRoot { .. }));
    }

    #[test]
    fn replace_swaps_the_snapshot() {
        let (queue, _rx) = poll_queue(4);
        let registry = StaticJobRegistry::new(build_jobs(&[job("app")], &queue).unwrap());
        let before = registry.list_all_jobs();

        registry.replace(build_jobs(&[job("app"), job("docs")], &queue).unwrap());

        assert_eq!(before.len(), 1);
        assert_eq!(registry.list_all_jobs().len(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn default_registry_is_empty() {
        let registry = StaticJobRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.list_all_jobs().is_empty());
    }
}

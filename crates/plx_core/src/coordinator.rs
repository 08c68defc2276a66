//! Composition root for the job orchestration subsystem.
//!
//! A `JobCoordinator` wires the store, event bus, supervisor, and reaper
//! together behind the job-management surface. Callers construct their
//! own instances (tests included) instead of sharing a global.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{RetentionSettings, Settings};
use crate::errors::JobResult;
use crate::events::{EventBus, JobEvent};
use crate::models::{Job, JobOptionOverrides};
use crate::reaper::Reaper;
use crate::store::JobStore;
use crate::supervisor::{WorkerLauncher, WorkerSupervisor};

/// Coordinates batch extraction jobs: creation, execution, observation,
/// cancellation, and eventual eviction.
pub struct JobCoordinator {
    store: Arc<JobStore>,
    bus: EventBus,
    supervisor: WorkerSupervisor,
    retention: RetentionSettings,
}

impl JobCoordinator {
    /// Create a coordinator that launches real worker processes.
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(JobStore::new());
        let bus = EventBus::new(settings.events.channel_capacity);
        let supervisor =
            WorkerSupervisor::new(Arc::clone(&store), bus.clone(), settings.worker.clone());
        Self {
            store,
            bus,
            supervisor,
            retention: settings.retention,
        }
    }

    /// Create a coordinator with a custom worker launcher.
    pub fn with_launcher(settings: Settings, launcher: Arc<dyn WorkerLauncher>) -> Self {
        let store = Arc::new(JobStore::new());
        let bus = EventBus::new(settings.events.channel_capacity);
        let supervisor =
            WorkerSupervisor::new(Arc::clone(&store), bus.clone(), settings.worker.clone())
                .with_launcher(launcher);
        Self {
            store,
            bus,
            supervisor,
            retention: settings.retention,
        }
    }

    /// Create a new pending job over the given items.
    pub fn create_job(
        &self,
        owner_id: &str,
        items: Vec<String>,
        overrides: JobOptionOverrides,
    ) -> JobResult<String> {
        self.store.create(owner_id, items, overrides)
    }

    /// Start the worker for a pending job.
    pub fn start_job(&self, job_id: &str) -> JobResult<()> {
        self.supervisor.start(job_id)
    }

    /// Get a snapshot of a job.
    pub fn get_job(&self, job_id: &str) -> JobResult<Job> {
        self.store.get(job_id)
    }

    /// Get snapshots of every job belonging to `owner_id`.
    pub fn list_jobs(&self, owner_id: &str) -> Vec<Job> {
        self.store.list_by_owner(owner_id)
    }

    /// Cancel a job, terminating its worker if one is running.
    pub fn cancel_job(&self, job_id: &str) -> JobResult<()> {
        self.supervisor.cancel(job_id)
    }

    /// Subscribe to lifecycle events for all jobs.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.bus.subscribe()
    }

    /// Spawn the retention reaper on its configured interval.
    ///
    /// The caller owns the returned handle; aborting it stops the sweeps.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        Reaper::from_settings(Arc::clone(&self.store), &self.retention).spawn()
    }

    /// The underlying job store.
    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }
}

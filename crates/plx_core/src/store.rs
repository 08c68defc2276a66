//! Authoritative in-memory registry of job records.
//!
//! The store is the single source of truth for job state. All mutation
//! after creation goes through the guarded mutators here, which enforce
//! the forward-only status machine: terminal writes are check-and-set,
//! and updates against an already-terminal job are dropped rather than
//! applied. Readers get clones, never references into the map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::errors::{JobError, JobResult};
use crate::models::{Job, JobOptionOverrides, JobStatus};
use crate::planner;

/// In-memory job registry, safe for concurrent use.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
    next_seq: AtomicU64,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new pending job and return its id.
    ///
    /// Option fields the caller left unset are resolved by the workload
    /// planner for the batch size.
    pub fn create(
        &self,
        owner_id: &str,
        items: Vec<String>,
        overrides: JobOptionOverrides,
    ) -> JobResult<String> {
        if items.is_empty() {
            return Err(JobError::EmptyItems);
        }

        let options = planner::resolve(items.len(), overrides);
        let id = self.next_id();
        let job = Job::new(id.clone(), owner_id, items, options);

        tracing::info!(
            job_id = %id,
            owner_id,
            items = job.items.len(),
            strategy = %job.options.strategy,
            "created job"
        );
        self.jobs.write().insert(id.clone(), job);
        Ok(id)
    }

    /// Get a snapshot of a job.
    pub fn get(&self, job_id: &str) -> JobResult<Job> {
        self.jobs
            .read()
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::not_found(job_id))
    }

    /// Get snapshots of every job belonging to `owner_id`.
    pub fn list_by_owner(&self, owner_id: &str) -> Vec<Job> {
        self.jobs
            .read()
            .values()
            .filter(|job| job.owner_id == owner_id)
            .cloned()
            .collect()
    }

    /// Number of jobs currently registered.
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Promote a pending job to processing. The single-start guard: a
    /// second start attempt fails rather than being silently ignored.
    pub(crate) fn try_promote(&self, job_id: &str) -> JobResult<Job> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::not_found(job_id))?;

        if job.status != JobStatus::Pending {
            return Err(JobError::not_startable(job_id, job.status));
        }

        job.status = JobStatus::Processing;
        job.started_at = Some(Utc::now());
        Ok(job.clone())
    }

    /// Apply `mutate` only while the job is still non-terminal.
    ///
    /// Returns a post-mutation snapshot, or `None` if the job is gone or
    /// already terminal. Late output from a cancelled worker is dropped
    /// here.
    pub(crate) fn update_if_active<F>(&self, job_id: &str, mutate: F) -> Option<Job>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(job_id)?;
        if job.status.is_terminal() {
            tracing::debug!(job_id, status = %job.status, "dropping update for terminal job");
            return None;
        }
        mutate(job);
        Some(job.clone())
    }

    /// Terminal check-and-set: move the job into `status`, stamp
    /// `completed_at`, and apply `mutate` - but only if no terminal state
    /// has been reached yet. Racing terminal writes resolve to whichever
    /// lands first; the loser gets `None`.
    pub(crate) fn finalize<F>(&self, job_id: &str, status: JobStatus, mutate: F) -> Option<Job>
    where
        F: FnOnce(&mut Job),
    {
        debug_assert!(status.is_terminal());

        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(job_id)?;
        if job.status.is_terminal() {
            tracing::debug!(
                job_id,
                current = %job.status,
                attempted = %status,
                "ignoring terminal write for already-terminal job"
            );
            return None;
        }
        job.status = status;
        job.completed_at = Some(Utc::now());
        mutate(job);
        Some(job.clone())
    }

    /// Evict terminal jobs whose completion predates `cutoff`.
    ///
    /// Jobs without a `completed_at` (pending or processing) are never
    /// touched. Returns the number of evicted records.
    pub(crate) fn sweep_expired(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| match job.completed_at {
            Some(completed_at) => completed_at > cutoff,
            None => true,
        });
        before - jobs.len()
    }

    fn next_id(&self) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        format!("job_{}_{}", Utc::now().timestamp_millis(), seq)
    }
}

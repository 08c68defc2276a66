//! Error types for job orchestration.
//!
//! Validation and state errors are returned synchronously to the caller of
//! the triggering operation. Worker and parse errors happen after the
//! caller has already received a successful start response; they are
//! recorded in the job's error log and surfaced through the `failed` event.

use std::io;

use thiserror::Error;

use crate::models::JobStatus;

/// Errors surfaced by the job-management surface and worker supervision.
#[derive(Error, Debug)]
pub enum JobError {
    /// Job creation was attempted with no work items.
    #[error("cannot create a job with an empty item list")]
    EmptyItems,

    /// No job with the given id exists.
    #[error("job '{id}' not found")]
    JobNotFound { id: String },

    /// Start was attempted on a job that is not pending.
    #[error("job '{id}' already {status}")]
    NotStartable { id: String, status: JobStatus },

    /// Worker exited with a non-zero code.
    #[error("worker exited with code {exit_code}: {detail}")]
    WorkerFailed { exit_code: i32, detail: String },

    /// Worker exited cleanly but its output payload was unreadable.
    #[error("failed to parse worker output: {detail}")]
    OutputParse { detail: String },

    /// The worker process could not be spawned.
    #[error("failed to spawn worker: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
}

impl JobError {
    /// Create a job-not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::JobNotFound { id: id.into() }
    }

    /// Create a not-startable error.
    pub fn not_startable(id: impl Into<String>, status: JobStatus) -> Self {
        Self::NotStartable {
            id: id.into(),
            status,
        }
    }

    /// Create a worker-failed error.
    pub fn worker_failed(exit_code: i32, detail: impl Into<String>) -> Self {
        Self::WorkerFailed {
            exit_code,
            detail: detail.into(),
        }
    }

    /// Create an output-parse error.
    pub fn output_parse(detail: impl Into<String>) -> Self {
        Self::OutputParse {
            detail: detail.into(),
        }
    }
}

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_startable_displays_status() {
        let err = JobError::not_startable("job_1_0", JobStatus::Processing);
        assert_eq!(err.to_string(), "job 'job_1_0' already processing");
    }

    #[test]
    fn worker_failed_displays_context() {
        let err = JobError::worker_failed(1, "connection refused");
        let msg = err.to_string();
        assert!(msg.contains("code 1"));
        assert!(msg.contains("connection refused"));
    }
}

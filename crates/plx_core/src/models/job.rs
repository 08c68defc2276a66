//! The job record and its execution options.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{JobStatus, Strategy};

/// Resolved execution options for a job.
///
/// Filled from caller overrides plus the workload planner at creation time;
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    /// Seconds the worker waits between items.
    pub delay_seconds: u32,
    /// Items the worker processes per chunk (advanced strategy only).
    pub chunk_size: u32,
    /// Which worker program to invoke.
    pub strategy: Strategy,
}

/// Caller-supplied option overrides.
///
/// Any field left unset is resolved by the workload planner for the
/// batch size at hand.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptionOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
}

/// One batch extraction request over an ordered list of work items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job identifier, assigned at creation.
    pub id: String,
    /// Identity of the requester; used for event routing and listing.
    pub owner_id: String,
    /// Ordered work-item identifiers. Immutable after creation.
    pub items: Vec<String>,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Completion percentage, 0-100. Non-decreasing while processing.
    pub progress: u8,
    /// Items the worker has reported as processed.
    pub processed_count: u32,
    /// Items extracted successfully.
    pub succeeded_count: u32,
    /// Items that failed extraction.
    pub failed_count: u32,
    /// Extracted output per item; populated on full successful completion.
    pub results: HashMap<String, String>,
    /// Append-only diagnostic messages.
    pub error_log: Vec<String>,
    /// When the job was promoted to processing.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Resolved execution options.
    pub options: JobOptions,
}

impl Job {
    /// Create a fresh pending job.
    pub(crate) fn new(
        id: String,
        owner_id: impl Into<String>,
        items: Vec<String>,
        options: JobOptions,
    ) -> Self {
        Self {
            id,
            owner_id: owner_id.into(),
            items,
            status: JobStatus::Pending,
            progress: 0,
            processed_count: 0,
            succeeded_count: 0,
            failed_count: 0,
            results: HashMap::new(),
            error_log: Vec::new(),
            started_at: None,
            completed_at: None,
            options,
        }
    }

    /// Total number of work items in this job.
    pub fn total_count(&self) -> u32 {
        self.items.len() as u32
    }

    /// Record a progress marker from the worker.
    ///
    /// The processed count is clamped to the item count and the percentage
    /// is kept monotonic, so a worker emitting markers out of order can
    /// never move progress backwards.
    pub(crate) fn record_progress(&mut self, processed: u32) {
        let total = self.total_count();
        let processed = processed.min(total);
        self.processed_count = processed;
        if total > 0 {
            let percent = ((processed as f64 / total as f64) * 100.0).round() as u8;
            self.progress = self.progress.max(percent.min(100));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_with_items(n: usize) -> Job {
        let items = (0..n).map(|i| format!("v{}", i)).collect();
        let options = JobOptions {
            delay_seconds: 5,
            chunk_size: 5,
            strategy: Strategy::Basic,
        };
        Job::new("job_1_0".to_string(), "owner", items, options)
    }

    #[test]
    fn progress_rounds_to_percent() {
        let mut job = job_with_items(12);
        job.record_progress(6);
        assert_eq!(job.progress, 50);
        assert_eq!(job.processed_count, 6);

        job.record_progress(12);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn progress_is_monotonic() {
        let mut job = job_with_items(10);
        job.record_progress(7);
        assert_eq!(job.progress, 70);

        job.record_progress(3);
        assert_eq!(job.processed_count, 3);
        assert_eq!(job.progress, 70);
    }

    #[test]
    fn processed_count_clamped_to_items() {
        let mut job = job_with_items(4);
        job.record_progress(9);
        assert_eq!(job.processed_count, 4);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn job_serializes_camel_case() {
        let job = job_with_items(2);
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"ownerId\":\"owner\""));
        assert!(json.contains("\"processedCount\":0"));
        assert!(json.contains("\"status\":\"pending\""));
    }
}

//! Typed lifecycle events and the broadcast bus.
//!
//! Events are published by the worker supervisor as a job moves through
//! its lifecycle. Payloads are serde-serializable in the shape a push
//! transport would forward to connected clients of the owning user.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::broadcast;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// A job lifecycle event.
///
/// Per-job delivery order matches publish order; events for different
/// jobs may interleave.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum JobEvent {
    /// The job was promoted to processing and a worker is being spawned.
    #[serde(rename_all = "camelCase")]
    Started { job_id: String, owner_id: String },

    /// The worker reported a progress marker.
    #[serde(rename_all = "camelCase")]
    Progress {
        job_id: String,
        owner_id: String,
        progress: u8,
        processed_count: u32,
        total_count: u32,
    },

    /// The worker exited cleanly and its output was accepted.
    #[serde(rename_all = "camelCase")]
    Completed {
        job_id: String,
        owner_id: String,
        succeeded_count: u32,
        failed_count: u32,
        results: HashMap<String, String>,
    },

    /// The worker failed or its output was unreadable.
    #[serde(rename_all = "camelCase")]
    Failed {
        job_id: String,
        owner_id: String,
        error: String,
    },

    /// The job was cancelled by the caller.
    #[serde(rename_all = "camelCase")]
    Cancelled { job_id: String, owner_id: String },
}

impl JobEvent {
    /// Event kind as a wire string.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Progress { .. } => "progress",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Id of the job this event concerns.
    pub fn job_id(&self) -> &str {
        match self {
            Self::Started { job_id, .. }
            | Self::Progress { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Cancelled { job_id, .. } => job_id,
        }
    }

    /// Owner the event should be routed to.
    pub fn owner_id(&self) -> &str {
        match self {
            Self::Started { owner_id, .. }
            | Self::Progress { owner_id, .. }
            | Self::Completed { owner_id, .. }
            | Self::Failed { owner_id, .. }
            | Self::Cancelled { owner_id, .. } => owner_id,
        }
    }
}

/// Broadcast channel for job lifecycle events.
///
/// Every live subscriber receives every event published after it
/// subscribed. Slow subscribers observe `RecvError::Lagged` once the
/// channel capacity is exceeded rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: JobEvent) {
        tracing::debug!(
            kind = event.kind(),
            job_id = event.job_id(),
            "publishing job event"
        );
        // A send error only means there are no live subscribers.
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(job_id: &str) -> JobEvent {
        JobEvent::Started {
            job_id: job_id.to_string(),
            owner_id: "owner".to_string(),
        }
    }

    #[tokio::test]
    async fn fan_out_to_all_subscribers() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(started("job_a"));

        assert_eq!(rx1.recv().await.unwrap().job_id(), "job_a");
        assert_eq!(rx2.recv().await.unwrap().job_id(), "job_a");
    }

    #[tokio::test]
    async fn per_job_order_is_preserved() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(started("job_a"));
        bus.publish(JobEvent::Progress {
            job_id: "job_a".to_string(),
            owner_id: "owner".to_string(),
            progress: 50,
            processed_count: 6,
            total_count: 12,
        });
        bus.publish(JobEvent::Cancelled {
            job_id: "job_a".to_string(),
            owner_id: "owner".to_string(),
        });

        let kinds = [
            rx.recv().await.unwrap().kind(),
            rx.recv().await.unwrap().kind(),
            rx.recv().await.unwrap().kind(),
        ];
        assert_eq!(kinds, ["started", "progress", "cancelled"]);
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::default();
        bus.publish(started("job_a"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn events_serialize_for_transport() {
        let event = JobEvent::Progress {
            job_id: "job_a".to_string(),
            owner_id: "u1".to_string(),
            progress: 50,
            processed_count: 6,
            total_count: 12,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"progress\""));
        assert!(json.contains("\"jobId\":\"job_a\""));
        assert!(json.contains("\"processedCount\":6"));
    }
}

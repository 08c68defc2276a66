//! Retention sweep for terminal jobs.
//!
//! Completed, failed, and cancelled jobs stay queryable for a retention
//! window after they finish, then get evicted. Pending and processing
//! jobs are never touched regardless of age.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::RetentionSettings;
use crate::store::JobStore;

/// Periodic eviction of expired terminal jobs.
pub struct Reaper {
    store: Arc<JobStore>,
    retention: chrono::Duration,
    interval: Duration,
}

impl Reaper {
    pub fn new(store: Arc<JobStore>, retention: chrono::Duration, interval: Duration) -> Self {
        Self {
            store,
            retention,
            interval,
        }
    }

    pub fn from_settings(store: Arc<JobStore>, settings: &RetentionSettings) -> Self {
        Self::new(
            store,
            chrono::Duration::hours(settings.retention_hours as i64),
            Duration::from_secs(settings.sweep_interval_secs),
        )
    }

    /// Run one sweep, evicting jobs whose completion fell out of the
    /// retention window. Returns the number of evicted records.
    pub fn sweep(&self) -> usize {
        self.sweep_before(Utc::now() - self.retention)
    }

    fn sweep_before(&self, cutoff: DateTime<Utc>) -> usize {
        let evicted = self.store.sweep_expired(cutoff);
        if evicted > 0 {
            tracing::info!(evicted, "evicted expired jobs");
        }
        evicted
    }

    /// Run sweeps on a fixed interval until the returned handle is
    /// aborted or dropped by the runtime shutting down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so a fresh
            // coordinator does not sweep on startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}

//! PLX Core - job orchestration for batch transcript extraction.
//!
//! This crate coordinates long-running batch extraction jobs over ordered
//! item lists: it tracks per-job state, supervises one external worker
//! process per job, parses the worker's diagnostic stream into structured
//! progress, and broadcasts typed lifecycle events. It has no transport
//! dependencies and can sit behind an HTTP API, a socket push layer, or a
//! CLI equally well.
//!
//! The entry point is [`JobCoordinator`]:
//!
//! ```ignore
//! use plx_core::config::Settings;
//! use plx_core::JobCoordinator;
//!
//! let coordinator = JobCoordinator::new(Settings::default());
//! let _reaper = coordinator.spawn_reaper();
//!
//! let job_id = coordinator.create_job("user-1", video_ids, Default::default())?;
//! coordinator.start_job(&job_id)?;
//! let mut events = coordinator.subscribe();
//! ```

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod events;
pub mod logging;
pub mod models;
pub mod planner;
pub mod progress;
pub mod reaper;
pub mod store;
pub mod supervisor;

pub use coordinator::JobCoordinator;
pub use errors::{JobError, JobResult};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

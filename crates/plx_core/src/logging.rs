//! Logging setup for the orchestration core.
//!
//! The crate logs through the `tracing` ecosystem; this module provides
//! the one-time subscriber setup for binaries embedding it.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects the RUST_LOG environment variable and falls back to the
/// provided default filter (e.g. "info" or "plx_core=debug"). Should be
/// called once at application startup.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field has a serde default so a partial or missing config file
//! still yields a usable configuration.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Worker invocation settings.
    #[serde(default)]
    pub worker: WorkerSettings,

    /// Terminal-job retention settings.
    #[serde(default)]
    pub retention: RetentionSettings,

    /// Event bus settings.
    #[serde(default)]
    pub events: EventSettings,
}

/// How the external extraction worker is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Interpreter the worker programs run under. Empty means the program
    /// is executed directly.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Program used for the basic strategy.
    #[serde(default = "default_basic_program")]
    pub basic_program: String,

    /// Program used for the advanced strategy.
    #[serde(default = "default_advanced_program")]
    pub advanced_program: String,

    /// Execution ceiling in seconds; 0 disables the watchdog and a worker
    /// that never exits is left running.
    #[serde(default)]
    pub max_job_duration_secs: u64,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_basic_program() -> String {
    "get_batch_transcripts.py".to_string()
}

fn default_advanced_program() -> String {
    "get_batch_transcripts_advanced.py".to_string()
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            basic_program: default_basic_program(),
            advanced_program: default_advanced_program(),
            max_job_duration_secs: 0,
        }
    }
}

/// When terminal jobs are evicted from the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionSettings {
    /// Hours a terminal job is kept after completion.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Seconds between reaper sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_retention_hours() -> u64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Event bus tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    /// Broadcast channel capacity per bus.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

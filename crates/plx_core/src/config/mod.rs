//! Configuration management.
//!
//! Settings are TOML-backed with serde defaults per section, loaded and
//! saved atomically by the `ConfigManager`.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{EventSettings, RetentionSettings, Settings, WorkerSettings};

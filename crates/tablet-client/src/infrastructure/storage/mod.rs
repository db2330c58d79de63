//! Storage infrastructure: the settings file and the live settings store.
//!
//! - `config` reads and writes the TOML file from the platform-appropriate
//!   directory (or an explicit path) and supplies defaults on first run.
//! - `settings` holds the current [`config::AppConfig`] in memory and
//!   notifies subscribers, such as the settings follower, when it changes.

pub mod config;
pub mod settings;

pub use config::{AppConfig, ConfigError};
pub use settings::SettingsStore;

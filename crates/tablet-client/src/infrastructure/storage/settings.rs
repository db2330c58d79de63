//! In-memory settings with change notification.
//!
//! The store holds the current [`AppConfig`] in a `tokio::sync::watch`
//! channel.  Readers call [`SettingsStore::current`]; long-lived tasks (the
//! settings follower) call [`SettingsStore::subscribe`] and await
//! `changed()`.  Writes that leave the value unchanged do not wake anyone,
//! so re-reading an unmodified config file every few seconds is free.

use tokio::sync::watch;
use tracing::debug;

use super::config::AppConfig;

/// Shared, observable application settings.
#[derive(Debug)]
pub struct SettingsStore {
    tx: watch::Sender<AppConfig>,
}

impl SettingsStore {
    pub fn new(initial: AppConfig) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// A snapshot of the current settings.
    pub fn current(&self) -> AppConfig {
        self.tx.borrow().clone()
    }

    /// A receiver that sees the current value and every later change.
    pub fn subscribe(&self) -> watch::Receiver<AppConfig> {
        self.tx.subscribe()
    }

    /// Replaces the whole configuration.  Returns `true` if anything changed.
    pub fn replace(&self, config: AppConfig) -> bool {
        self.update(|current| {
            if *current == config {
                return false;
            }
            *current = config;
            true
        })
    }

    /// Sets or clears the target host.  Returns `true` if it changed.
    pub fn set_host(&self, host: Option<String>) -> bool {
        self.update(|current| {
            if current.network.host == host {
                return false;
            }
            current.network.host = host;
            true
        })
    }

    /// Enables or disables the stylus-only filter.  Returns `true` if it changed.
    pub fn set_stylus_only(&self, stylus_only: bool) -> bool {
        self.update(|current| {
            if current.input.stylus_only == stylus_only {
                return false;
            }
            current.input.stylus_only = stylus_only;
            true
        })
    }

    fn update(&self, modify: impl FnOnce(&mut AppConfig) -> bool) -> bool {
        let changed = self.tx.send_if_modified(modify);
        if changed {
            debug!("settings changed");
        }
        changed
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Keeps the stream pointed at the configured host.
//!
//! The follower subscribes to the [`SettingsStore`](crate::infrastructure::storage::SettingsStore)
//! and issues one reconfiguration at startup and one for every change of
//! `network.host` or `network.input_port`.  Unrelated changes (display
//! preferences, the stylus filter) are ignored.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::stream_events::NetworkClient;
use crate::infrastructure::storage::AppConfig;

/// The part of the settings that decides where events go.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    host: Option<String>,
    default_port: u16,
}

impl Target {
    fn of(config: &AppConfig) -> Self {
        Self {
            host: config.network.host.clone(),
            default_port: config.network.input_port,
        }
    }
}

/// Spawns the follower task.  It ends when the settings store is dropped.
///
/// An unset host is sent as an empty host string: the worker closes the
/// previous link and reports an invalid endpoint, so events are dropped
/// rather than sent to a stale host.
pub fn spawn_settings_follower(
    client: Arc<NetworkClient>,
    mut settings: watch::Receiver<AppConfig>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut current = Target::of(&settings.borrow_and_update());
        apply(&client, &current).await;

        while settings.changed().await.is_ok() {
            let next = Target::of(&settings.borrow_and_update());
            if next == current {
                debug!("settings changed; input target unchanged");
                continue;
            }
            current = next;
            apply(&client, &current).await;
        }
        debug!("settings store closed; follower exiting");
    })
}

async fn apply(client: &NetworkClient, target: &Target) {
    let host = target.host.as_deref().unwrap_or("");
    match client.reconfigure_with_port(host, target.default_port).await {
        Ok(peer) => info!("input target is now {peer}"),
        Err(e) if target.host.is_none() => info!("no host configured; input is paused ({e})"),
        Err(e) => warn!("input target {host:?} unusable: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! NetTablet client entry point.
//!
//! Streams input events to the host named in the config file (or on the
//! command line) until Ctrl-C.  The UI that normally produces pen samples is
//! not part of this binary; `--demo-stroke` draws a short synthetic stroke
//! so the host side can be checked end to end.
//!
//! # Usage
//!
//! ```text
//! tablet-client [OPTIONS]
//!
//! Options:
//!   --config <PATH>           Config file [default: platform config dir]
//!   --host <HOST>             Target host, overrides network.host
//!   --reload-interval <SECS>  Config re-read interval, 0 disables [default: 2]
//!   --demo-stroke             Draw a synthetic stroke once connected
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  ├─ SettingsStore          -- current AppConfig, re-read every few seconds
//!  ├─ NetworkClient          -- event channel + network worker task
//!  ├─ settings follower      -- reconfigures the client on host changes
//!  └─ demo stroke (optional) -- PointerTranslator → NetworkClient::submit
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use tablet_client::application::capture_input::{PointerAction, PointerSample, PointerTranslator};
use tablet_client::application::follow_settings::spawn_settings_follower;
use tablet_client::application::stream_events::{ClientSettings, EventSink, NetworkClient};
use tablet_client::infrastructure::network::LinkStatus;
use tablet_client::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to,
};
use tablet_client::infrastructure::storage::{AppConfig, ConfigError, SettingsStore};
use tablet_core::ToolState;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// NetTablet client.
///
/// Sends pen and touch input from this device to a host computer as UDP
/// datagrams.
#[derive(Debug, Parser)]
#[command(name = "tablet-client", about = "Stream tablet input to a host over UDP", version)]
struct Cli {
    /// Path to the TOML config file.
    ///
    /// Defaults to `config.toml` in the platform config directory.
    #[arg(long, env = "NETTABLET_CONFIG")]
    config: Option<PathBuf>,

    /// Host to stream to (`name`, `name:port`, `[v6]:port`).
    ///
    /// Takes precedence over `network.host` in the config file, including
    /// after a reload.
    #[arg(long, env = "NETTABLET_HOST")]
    host: Option<String>,

    /// Seconds between config file reloads.  `0` disables reloading.
    #[arg(long, default_value_t = 2)]
    reload_interval: u64,

    /// Draw a short synthetic stroke once the link is up.
    #[arg(long)]
    demo_stroke: bool,
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path().context("no --config given and no platform config dir"),
        }
    }

    /// Loads the config file and applies command-line overrides.
    fn load_settings(&self, path: &Path) -> anyhow::Result<AppConfig> {
        let mut config = load_config_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        if let Some(host) = &self.host {
            config.network.host = Some(host.clone());
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path()?;
    let config = cli.load_settings(&config_path)?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .init();

    info!("NetTablet client starting (config: {})", config_path.display());
    match ensure_config_file(&config_path) {
        Ok(true) => info!("wrote default settings to {}", config_path.display()),
        Ok(false) => {}
        Err(e) => warn!("could not write default settings: {e}"),
    }
    if config.network.host.is_none() {
        warn!("no host configured; input is paused until network.host is set");
    }
    let display_cfg = &config.display;
    if display_cfg.show_host_screen {
        match config.network.mirror_url() {
            Some(url) => info!("host screen mirror: {url}"),
            None => warn!("host screen mirror enabled but network.host is not usable"),
        }
    }
    debug!(
        "display: dark_canvas={} keep_display_active={} template_image={:?}",
        display_cfg.dark_canvas, display_cfg.keep_display_active, display_cfg.template_image
    );

    let store = Arc::new(SettingsStore::new(config.clone()));
    let client = Arc::new(NetworkClient::with_udp(ClientSettings {
        default_port: config.network.input_port,
    }));
    client.start()?;

    let follower = spawn_settings_follower(Arc::clone(&client), store.subscribe());
    let reloader = (cli.reload_interval > 0).then(|| {
        let interval = Duration::from_secs(cli.reload_interval);
        spawn_reloader(Arc::clone(&store), cli.host.clone(), config_path.clone(), interval)
    });
    let demo = cli.demo_stroke.then(|| {
        let sink = client.sink();
        let mut link = client.subscribe();
        let stylus_only = config.input.stylus_only;
        tokio::spawn(async move {
            // Wait for the first working link; give up if the worker stops.
            loop {
                let status = link.borrow_and_update().status;
                match status {
                    LinkStatus::Connected => break,
                    LinkStatus::Closed => return,
                    LinkStatus::Unconfigured | LinkStatus::Failed => {}
                }
                if link.changed().await.is_err() {
                    return;
                }
            }
            draw_demo_stroke(&sink, stylus_only).await;
        })
    });

    info!("NetTablet client ready.  Press Ctrl-C to exit.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown signal received");

    for task in [reloader, demo].into_iter().flatten() {
        task.abort();
        // Wait for the abort so the task's handles are released.
        let _ = task.await;
    }
    // Dropping the last store handle ends the follower.
    drop(store);
    if let Err(e) = follower.await {
        error!("settings follower failed: {e}");
    }

    match client.shutdown().await {
        Some(report) => info!(
            "NetTablet client stopped: {} frames sent, {} dropped, {} send failures, {} reconfigurations",
            report.frames_sent, report.frames_dropped, report.send_failures, report.reconfigurations
        ),
        None => info!("NetTablet client stopped"),
    }
    Ok(())
}

// ── Config file ───────────────────────────────────────────────────────────────

/// Writes the default settings to `path` on first run so there is a file to
/// edit.  Returns `true` if a file was created.
fn ensure_config_file(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }
    save_config_to(path, &AppConfig::default())?;
    Ok(true)
}

// ── Background tasks ──────────────────────────────────────────────────────────

/// Re-reads the config file every `interval` and pushes changes into `store`.
///
/// A file that fails to load keeps the previous settings.
fn spawn_reloader(
    store: Arc<SettingsStore>,
    host_override: Option<String>,
    path: PathBuf,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; the file was just loaded.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match load_config_from(&path) {
                Ok(mut config) => {
                    if host_override.is_some() {
                        config.network.host = host_override.clone();
                    }
                    if store.replace(config) {
                        info!("reloaded settings from {}", path.display());
                    }
                }
                Err(e) => warn!("keeping previous settings: {e}"),
            }
        }
    })
}

/// Feeds a hover-in, a diagonal line and a hover-out through a translator.
async fn draw_demo_stroke(sink: &EventSink, stylus_only: bool) {
    const STEPS: u16 = 50;
    let mut translator = PointerTranslator::new(1000.0, 1000.0);
    translator.set_stylus_only(stylus_only);
    sink.submit(translator.attach_device(0));

    let sample = |action: PointerAction, t: f32| PointerSample {
        action,
        x: 100.0 + 800.0 * t,
        y: 100.0 + 800.0 * t,
        pressure: if matches!(action, PointerAction::Move) { 0.5 + t } else { 0.0 },
        orientation: 0.0,
        tool: ToolState::Stylus,
        device_id: 0,
    };

    let mut actions = vec![(PointerAction::HoverEnter, 0.0), (PointerAction::Down, 0.0)];
    actions.extend((1..=STEPS).map(|i| (PointerAction::Move, f32::from(i) / f32::from(STEPS))));
    actions.extend([(PointerAction::Up, 1.0), (PointerAction::HoverExit, 1.0)]);

    for (action, t) in actions {
        for event in translator.translate(&sample(action, t)) {
            sink.submit(event);
        }
        tokio::time::sleep(Duration::from_millis(8)).await;
    }
    debug!("demo stroke submitted");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["tablet-client"]);

        // Assert
        assert_eq!(cli.reload_interval, 2);
        assert!(!cli.demo_stroke);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "tablet-client",
            "--config",
            "/tmp/nettablet.toml",
            "--host",
            "10.0.0.5:7273",
            "--reload-interval",
            "0",
            "--demo-stroke",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/nettablet.toml")));
        assert_eq!(cli.host.as_deref(), Some("10.0.0.5:7273"));
        assert_eq!(cli.reload_interval, 0);
        assert!(cli.demo_stroke);
    }

    #[test]
    fn test_explicit_config_path_is_used() {
        let cli = Cli::parse_from(["tablet-client", "--config", "/tmp/x.toml"]);
        assert_eq!(cli.config_path().unwrap(), PathBuf::from("/tmp/x.toml"));
    }

    #[test]
    fn test_host_flag_overrides_config_file() {
        // Arrange: a missing file loads as defaults (no host)
        let cli = Cli::parse_from(["tablet-client", "--host", "studio-pc"]);
        let path = PathBuf::from("/nonexistent/nettablet/config.toml");

        // Act
        let config = cli.load_settings(&path).expect("defaults");

        // Assert
        assert_eq!(config.network.host.as_deref(), Some("studio-pc"));
        assert_eq!(config.network.input_port, 40118);
    }

    #[test]
    fn test_first_run_writes_default_config_once() {
        // Arrange
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let dir = std::env::temp_dir()
            .join(format!("nettablet_main_{}_{nanos}", std::process::id()));
        let path = dir.join("config.toml");

        // Act
        let created = ensure_config_file(&path).expect("first write");
        let again = ensure_config_file(&path).expect("second call");

        // Assert
        assert!(created);
        assert!(!again);
        assert_eq!(load_config_from(&path).unwrap(), AppConfig::default());
        let _ = std::fs::remove_dir_all(&dir);
    }
}

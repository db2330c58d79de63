//! TOML-based configuration persistence for the tablet client.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\NetTablet\config.toml`
//! - Linux:    `~/.config/nettablet/config.toml`
//! - macOS:    `~/Library/Application Support/NetTablet/config.toml`
//!
//! or to an explicit path given on the command line.
//!
//! Example file:
//!
//! ```toml
//! [client]
//! log_level = "info"
//!
//! [network]
//! host = "192.168.1.20"
//! input_port = 40118
//! mirror_port = 8554
//!
//! [input]
//! stylus_only = false
//!
//! [display]
//! show_host_screen = false
//! dark_canvas = false
//! keep_display_active = true
//! ```
//!
//! # Serde default values
//!
//! Every section and every field has a default, so a missing file, an empty
//! file and a file written by an older version all load.  An unset
//! `network.host` is the normal first-run state: the client starts, but
//! every input event is dropped until a host is configured.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tablet_core::{Endpoint, DEFAULT_INPUT_PORT, DEFAULT_MIRROR_PORT};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// General client behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where input events (and the screen mirror) come from and go to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Host name or address of the receiving computer, optionally with a
    /// port (`"studio-pc"`, `"10.0.0.5:7273"`, `"[fe80::1]"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// UDP port used when `host` carries no port of its own.
    #[serde(default = "default_input_port")]
    pub input_port: u16,
    /// RTSP port of the host's screen mirror.
    #[serde(default = "default_mirror_port")]
    pub mirror_port: u16,
}

/// Input filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    /// Ignore finger touches; only stylus and eraser samples are sent.
    #[serde(default)]
    pub stylus_only: bool,
}

/// Canvas presentation preferences.  The binary logs them at startup; the
/// canvas UI applies them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Play the host's screen mirror behind the canvas.
    #[serde(default)]
    pub show_host_screen: bool,
    /// Dark canvas background.
    #[serde(default)]
    pub dark_canvas: bool,
    /// Keep the device's display from sleeping while the canvas is shown.
    #[serde(default = "default_true")]
    pub keep_display_active: bool,
    /// Optional image drawn as a template under the canvas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_image: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_input_port() -> u16 {
    DEFAULT_INPUT_PORT
}
fn default_mirror_port() -> u16 {
    DEFAULT_MIRROR_PORT
}
fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: None,
            input_port: default_input_port(),
            mirror_port: default_mirror_port(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_host_screen: false,
            dark_canvas: false,
            keep_display_active: default_true(),
            template_image: None,
        }
    }
}

impl NetworkConfig {
    /// The RTSP URL of the host's screen mirror, if a usable host is set.
    ///
    /// Any port in `host` belongs to the input stream and is replaced by
    /// `mirror_port`.
    pub fn mirror_url(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        let endpoint = Endpoint::parse(host, self.mirror_port).ok()?;
        Some(format!(
            "rtsp://{}/screen",
            Endpoint::new(endpoint.host, self.mirror_port)
        ))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(platform_config_dir()
        .ok_or(ConfigError::NoPlatformConfigDir)?
        .join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory, including the `NetTablet` folder.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("NetTablet"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("nettablet"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("NetTablet")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

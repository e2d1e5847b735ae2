//! Configuration for the wamly CLI.
//!
//! TOML file plus `WAMLY_` environment overrides, validated and translated
//! to `wamly_core::ControllerConfig`. The static `[[devices]]` list feeds
//! `StaticDiscovery`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use wamly_api::{ReconnectConfig, TransportConfig};
use wamly_core::config::DEFAULT_PORT;
use wamly_core::{ControllerConfig, DeviceDescriptor, LinkConfig, ViewerConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub reconnect: Reconnect,

    #[serde(default)]
    pub link: Link,

    #[serde(default)]
    pub viewers: Viewers,

    /// Speakers known without discovery.
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// API port used when a device entry does not name one.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Acknowledgement budget per command, in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Socket connect budget, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            port: default_port(),
            command_timeout_ms: default_command_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_command_timeout_ms() -> u64 {
    5_000
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Reconnect {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Attempts before a link gives up. 0 retries forever.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for Reconnect {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_max_retries() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Link {
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Consecutive timeouts that recycle a connection. 0 disables.
    #[serde(default = "default_timeout_threshold")]
    pub timeout_threshold: u32,

    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: default_handshake_timeout_ms(),
            timeout_threshold: default_timeout_threshold(),
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

fn default_handshake_timeout_ms() -> u64 {
    5_000
}
fn default_timeout_threshold() -> u32 {
    3
}
fn default_event_log_capacity() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Viewers {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_keepalive_timeout_secs")]
    pub keepalive_timeout_secs: u64,

    #[serde(default = "default_max_keepalive_failures")]
    pub max_keepalive_failures: u32,
}

impl Default for Viewers {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            keepalive_timeout_secs: default_keepalive_timeout_secs(),
            max_keepalive_failures: default_max_keepalive_failures(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}
fn default_keepalive_timeout_secs() -> u64 {
    60
}
fn default_max_keepalive_failures() -> u32 {
    3
}

/// One `[[devices]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceEntry {
    pub address: String,

    /// Defaults to the address.
    pub id: Option<String>,

    /// Defaults to `[defaults] port`.
    pub port: Option<u16>,

    pub name: Option<String>,

    pub model: Option<String>,
}

impl DeviceEntry {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            id: None,
            port: None,
            name: None,
            model: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "wamly", "wamly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("wamly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources: defaults, then the TOML file, then `WAMLY_*`
/// variables (`WAMLY_DEFAULTS__PORT=55002`).
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WAMLY_").split("__"))
}

/// Load and validate the config at `path`. A missing file is not an
/// error; defaults and the environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), exists = path.exists(), "loading config");
    let config: Config = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}

/// Load the config from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Validation & translation ────────────────────────────────────────

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.port == 0 {
            return Err(invalid("defaults.port", "must be non-zero"));
        }
        if self.defaults.command_timeout_ms == 0 {
            return Err(invalid("defaults.command_timeout_ms", "must be non-zero"));
        }
        if self.link.handshake_timeout_ms == 0 {
            return Err(invalid("link.handshake_timeout_ms", "must be non-zero"));
        }
        if self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms {
            return Err(invalid(
                "reconnect.initial_delay_ms",
                format!(
                    "{} exceeds max_delay_ms {}",
                    self.reconnect.initial_delay_ms, self.reconnect.max_delay_ms
                ),
            ));
        }
        if self.viewers.queue_capacity == 0 {
            return Err(invalid("viewers.queue_capacity", "must be at least 1"));
        }

        let mut seen = std::collections::HashSet::new();
        for (i, device) in self.devices.iter().enumerate() {
            if device.address.trim().is_empty() {
                return Err(invalid(&format!("devices[{i}].address"), "must not be empty"));
            }
            if device.port == Some(0) {
                return Err(invalid(&format!("devices[{i}].port"), "must be non-zero"));
            }
            let id = device.id.as_deref().unwrap_or(&device.address);
            if !seen.insert(id.to_owned()) {
                return Err(invalid(
                    &format!("devices[{i}]"),
                    format!("duplicate device id '{id}'"),
                ));
            }
        }
        Ok(())
    }

    /// Build the core runtime configuration.
    pub fn to_controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        self.validate()?;
        Ok(ControllerConfig {
            link: LinkConfig {
                reconnect: ReconnectConfig {
                    initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
                    max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
                    max_retries: Some(self.reconnect.max_retries).filter(|n| *n > 0),
                },
                handshake_timeout: Duration::from_millis(self.link.handshake_timeout_ms),
                command_timeout: Duration::from_millis(self.defaults.command_timeout_ms),
                timeout_threshold: self.link.timeout_threshold,
                event_log_capacity: self.link.event_log_capacity,
            },
            viewers: ViewerConfig {
                queue_capacity: self.viewers.queue_capacity,
                keepalive_timeout: Duration::from_secs(self.viewers.keepalive_timeout_secs),
                max_keepalive_failures: self.viewers.max_keepalive_failures,
            },
            transport: TransportConfig {
                connect_timeout: Duration::from_millis(self.defaults.connect_timeout_ms),
                ..TransportConfig::default()
            },
            default_port: self.defaults.port,
        })
    }

    /// Descriptors for the `[[devices]]` list, in file order.
    pub fn static_devices(&self) -> Vec<DeviceDescriptor> {
        self.devices
            .iter()
            .map(|entry| {
                let mut descriptor = DeviceDescriptor::new(
                    entry.address.trim(),
                    entry.port.unwrap_or(self.defaults.port),
                );
                if let Some(id) = &entry.id {
                    descriptor.id = id.as_str().into();
                }
                descriptor.name.clone_from(&entry.name);
                descriptor.model.clone_from(&entry.model);
                descriptor
            })
            .collect()
    }
}

// ── Runtime session configuration ──
//
// These types describe how links and viewers behave. They never touch
// disk: the CLI loads a config file and builds a `ControllerConfig`.

use std::time::Duration;

use wamly_api::{ReconnectConfig, TransportConfig};

/// API port WAM speakers listen on.
pub const DEFAULT_PORT: u16 = 55001;

/// Tuning for every `DeviceLink`.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Backoff used when a connected link loses its socket.
    pub reconnect: ReconnectConfig,
    /// Budget for opening the socket and completing the handshake.
    pub handshake_timeout: Duration,
    /// Default acknowledgement budget for a command.
    pub command_timeout: Duration,
    /// Consecutive command timeouts that recycle the connection. 0 disables.
    pub timeout_threshold: u32,
    /// Maximum entries kept in the per-link event log.
    pub event_log_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            handshake_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            timeout_threshold: 3,
            event_log_capacity: 50,
        }
    }
}

/// Tuning for the update broadcaster.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Messages buffered per viewer before it is considered too slow.
    pub queue_capacity: usize,
    /// A viewer that has not pinged for this long is reaped.
    pub keepalive_timeout: Duration,
    /// Pongs that may fail to enqueue in a row before the viewer is dropped.
    pub max_keepalive_failures: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            keepalive_timeout: Duration::from_secs(60),
            max_keepalive_failures: 3,
        }
    }
}

/// Everything a `Controller` needs.
///
/// Built by the CLI, passed to `Controller::new`. Core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub link: LinkConfig,
    pub viewers: ViewerConfig,
    pub transport: TransportConfig,
    /// Port assumed when a caller connects by address alone.
    pub default_port: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            viewers: ViewerConfig::default(),
            transport: TransportConfig::default(),
            default_port: DEFAULT_PORT,
        }
    }
}

// ── Core error types ──
//
// User-facing errors from wamly-core. Callers never see socket or codec
// failures directly; `From<wamly_api::Error>` folds them into the
// session-level variants below.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to speaker at {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("Speaker {device} is not connected")]
    NotConnected { device: String },

    #[error("Speaker {device} did not acknowledge within {timeout_ms}ms")]
    Timeout { device: String, timeout_ms: u64 },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("No group contains device {identifier}")]
    GroupNotFound { identifier: String },

    #[error("Device {identifier} already has a live connection")]
    AlreadyConnected { identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Speaker rejected {method}: {message}")]
    Rejected { method: String, message: String },

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Invalid value '{value}' for {command}: {reason}")]
    InvalidValue {
        command: String,
        value: String,
        reason: String,
    },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Discovery failed: {message}")]
    Discovery { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Lookup failures: the id or group does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. } | Self::GroupNotFound { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wamly_api::Error> for CoreError {
    fn from(err: wamly_api::Error) -> Self {
        match err {
            wamly_api::Error::Connect { address, reason } => CoreError::Connect { address, reason },
            wamly_api::Error::HandshakeRejected { address, reason } => CoreError::Connect {
                address,
                reason: format!("handshake rejected: {reason}"),
            },
            wamly_api::Error::Timeout { timeout_ms } => CoreError::Timeout {
                device: "<unknown>".into(),
                timeout_ms,
            },
            wamly_api::Error::Io(e) => CoreError::Connect {
                address: "<unknown>".into(),
                reason: e.to_string(),
            },
            wamly_api::Error::Closed => CoreError::Connect {
                address: "<unknown>".into(),
                reason: "connection closed by speaker".into(),
            },
            wamly_api::Error::Framing(msg) => CoreError::Internal(format!("Framing error: {msg}")),
            wamly_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            wamly_api::Error::InvalidCall(reason) => CoreError::InvalidValue {
                command: "raw".into(),
                value: String::new(),
                reason,
            },
        }
    }
}

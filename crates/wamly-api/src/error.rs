use thiserror::Error;

/// Top-level error type for the `wamly-api` crate.
///
/// Covers every failure mode of the speaker socket: connecting, framing,
/// decoding, and the handshake. `wamly-core` maps these into user-facing
/// errors and decides which ones trigger a reconnect.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// The socket could not be opened (refused, unreachable, DNS failure).
    #[error("Cannot connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    /// The speaker answered the handshake with a rejection.
    #[error("Handshake rejected by {address}: {reason}")]
    HandshakeRejected { address: String, reason: String },

    /// An operation did not complete within its budget.
    #[error("Timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Transport ───────────────────────────────────────────────────
    /// Socket-level I/O failure on an open connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection.
    #[error("Connection closed by peer")]
    Closed,

    /// A frame exceeded the configured maximum length or was not valid UTF-8.
    #[error("Framing error: {0}")]
    Framing(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON (de)serialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// An outbound call failed local validation before it hit the wire.
    #[error("Invalid API call: {0}")]
    InvalidCall(String),
}

impl Error {
    /// Returns `true` if the connection is gone and reconnecting might help.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Timeout { .. } | Self::Io(_) | Self::Closed
        )
    }

    /// Returns `true` if the error concerns a single frame and the
    /// connection itself is still usable.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Self::Deserialization { .. } | Self::InvalidCall(_) | Self::Framing(_)
        )
    }
}

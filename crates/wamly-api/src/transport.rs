//! Opening framed connections to speakers.
//!
//! [`Transport`] is the seam between the session layer and the network:
//! `wamly-core` only ever sees a [`Connection`], a sink of outbound
//! [`Frame`]s paired with a stream of inbound ones. [`TcpTransport`] is the
//! production implementation; tests plug in an in-memory speaker.

use std::pin::Pin;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{Sink, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::codec::FrameCodec;
use crate::error::Error;
use crate::frame::Frame;

/// Outbound half of a speaker connection. Closing it releases the socket.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = Error> + Send>>;

/// Inbound half of a speaker connection. `None` means the peer closed.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, Error>> + Send>>;

// ── Connection ───────────────────────────────────────────────────────

/// An open, framed connection to one speaker.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
    /// Remote address as reported by the socket, for logging.
    pub peer: String,
}

impl Connection {
    pub fn new(sink: FrameSink, stream: FrameStream, peer: impl Into<String>) -> Self {
        Self {
            sink,
            stream,
            peer: peer.into(),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

// ── Transport ────────────────────────────────────────────────────────

/// Something that can open a [`Connection`] to `address:port`.
pub trait Transport: Send + Sync + 'static {
    fn open<'a>(&'a self, address: &'a str, port: u16) -> BoxFuture<'a, Result<Connection, Error>>;
}

/// Socket-level knobs for [`TcpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Budget for the TCP connect itself. Default: 5s.
    pub connect_timeout: Duration,
    /// Longest accepted inbound line, in bytes. Default: 64 KiB.
    pub max_frame_len: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            max_frame_len: 64 * 1024,
        }
    }
}

// ── TcpTransport ─────────────────────────────────────────────────────

/// Newline-delimited JSON over plain TCP.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: TransportConfig,
}

impl TcpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    async fn open_tcp(&self, address: &str, port: u16) -> Result<Connection, Error> {
        let target = format!("{address}:{port}");
        let timeout_ms = u64::try_from(self.config.connect_timeout.as_millis()).unwrap_or(u64::MAX);

        let stream =
            match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&target)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    return Err(Error::Connect {
                        address: target,
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    return Err(Error::Connect {
                        address: target,
                        reason: format!("no answer within {timeout_ms}ms"),
                    });
                }
            };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer = %target, error = %e, "could not disable Nagle");
        }
        let peer = stream
            .peer_addr()
            .map_or_else(|_| target.clone(), |addr| addr.to_string());
        tracing::debug!(%peer, "speaker socket open");

        let (read_half, write_half) = stream.into_split();
        let codec = FrameCodec::new(self.config.max_frame_len);

        let sink = FramedWrite::new(write_half, codec.clone());
        // Outer errors are socket failures; inner ones are a single bad line.
        let stream =
            FramedRead::new(read_half, codec).map(|item| item.and_then(std::convert::identity));

        Ok(Connection::new(Box::pin(sink), Box::pin(stream), peer))
    }
}

impl Transport for TcpTransport {
    fn open<'a>(&'a self, address: &'a str, port: u16) -> BoxFuture<'a, Result<Connection, Error>> {
        Box::pin(self.open_tcp(address, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transport_config() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.max_frame_len, 65_536);
    }
}

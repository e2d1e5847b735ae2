// wamly-api: Socket transport and wire frames for WAM speakers

pub mod codec;
pub mod error;
pub mod frame;
pub mod reconnect;
pub mod transport;

pub use codec::FrameCodec;
pub use error::Error;
pub use frame::{ApiCall, ApiType, Arg, Frame, FrameKind, PropertyMap, PropertyValue};
pub use reconnect::{Backoff, ReconnectConfig};
pub use transport::{Connection, FrameSink, FrameStream, TcpTransport, Transport, TransportConfig};

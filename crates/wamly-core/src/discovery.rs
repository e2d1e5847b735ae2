//! Source of candidate speakers.
//!
//! How speakers are found on the network is not this crate's concern; it
//! only consumes whatever a [`Discovery`] implementation returns.

use futures_util::future::BoxFuture;

use crate::error::CoreError;
use crate::model::DeviceDescriptor;

pub trait Discovery: Send + Sync + 'static {
    fn discover(&self) -> BoxFuture<'_, Result<Vec<DeviceDescriptor>, CoreError>>;
}

/// A fixed list of speakers, typically the `[[devices]]` config section.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    devices: Vec<DeviceDescriptor>,
}

impl StaticDiscovery {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self { devices }
    }
}

impl Discovery for StaticDiscovery {
    fn discover(&self) -> BoxFuture<'_, Result<Vec<DeviceDescriptor>, CoreError>> {
        let devices = self.devices.clone();
        Box::pin(async move { Ok(devices) })
    }
}

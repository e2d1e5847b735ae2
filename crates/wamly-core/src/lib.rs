// wamly-core: Session and dispatch layer between wamly-api and consumers (CLI).

pub mod broadcast;
pub mod command;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod group;
pub mod link;
pub mod model;
pub mod registry;

// ── Primary re-exports ──────────────────────────────────────────────
pub use broadcast::{Broadcaster, Viewer, ViewerId, ViewerMessage};
pub use command::{Command, RawCall, Target};
pub use config::{ControllerConfig, LinkConfig, ViewerConfig};
pub use controller::{Controller, DispatchOutcome};
pub use discovery::{Discovery, StaticDiscovery};
pub use dispatch::Dispatcher;
pub use error::CoreError;
pub use group::GroupIndex;
pub use link::{CallOptions, DeviceLink, LinkState, LinkUpdate};
pub use registry::Registry;

pub use model::{
    DeviceDescriptor, DeviceEvent, DeviceId, DeviceInfo, DeviceSnapshot, Group, GroupResult,
};

// Wire-level types callers need to build raw calls.
pub use wamly_api::{ApiCall, ApiType, PropertyMap, PropertyValue, ReconnectConfig};

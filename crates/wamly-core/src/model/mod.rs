// ── Session domain model ──
//
// Types shared by the link, registry, dispatcher, and broadcaster. They
// are plain data: every live value is owned by a `DeviceLink` and these
// are point-in-time copies.

pub mod device;
pub mod event;
pub mod group;

pub use device::{DeviceDescriptor, DeviceId, DeviceInfo, DeviceSnapshot};
pub use event::DeviceEvent;
pub use group::{Group, GroupResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wamly_api::{ApiType, Frame, FrameKind, PropertyMap};

use super::device::DeviceId;

/// One inbound frame as recorded in a link's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub device: DeviceId,
    pub received_at: DateTime<Utc>,
    pub kind: FrameKind,
    pub api_type: ApiType,
    pub method: String,
    pub payload: PropertyMap,
    /// `false` for error frames.
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceEvent {
    pub fn from_frame(device: DeviceId, frame: &Frame) -> Self {
        Self {
            device,
            received_at: Utc::now(),
            kind: frame.kind,
            api_type: frame.api_type,
            method: frame.method.clone(),
            payload: frame.payload.clone(),
            success: frame.kind != FrameKind::Error,
            error: frame.error.clone(),
        }
    }
}

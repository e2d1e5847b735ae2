use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wamly_api::{PropertyMap, PropertyValue};

use crate::link::LinkState;

/// Fallback model string when a speaker does not report one.
pub const DEFAULT_MODEL: &str = "Samsung WAM Speaker";

const UNKNOWN: &str = "Unknown";

// ── DeviceId ────────────────────────────────────────────────────────

/// Identifier of a speaker. Speakers have no stable serial on the API
/// socket, so the network address doubles as identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── DeviceDescriptor ────────────────────────────────────────────────

/// A candidate speaker as reported by discovery. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    pub address: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl DeviceDescriptor {
    /// Descriptor for a bare address; the address is the id.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        let address = address.into();
        Self {
            id: DeviceId::new(address.clone()),
            address,
            port,
            name: None,
            model: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

// ── DeviceInfo ──────────────────────────────────────────────────────

/// Human-oriented summary of a connected speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub address: String,
    pub port: u16,
    pub name: String,
    pub model: String,
    pub mac: String,
    pub version: String,
    pub power: String,
    pub volume: String,
    pub input: String,
}

impl DeviceInfo {
    /// Summarise reported properties, falling back to the descriptor and
    /// then to generic placeholders.
    pub fn from_properties(descriptor: &DeviceDescriptor, props: &PropertyMap) -> Self {
        let text = |key: &str| props.get(key).map(PropertyValue::to_string);
        let or_unknown = |key: &str| text(key).unwrap_or_else(|| UNKNOWN.to_owned());

        let name = text("friendlyName")
            .or_else(|| text("modelName"))
            .or_else(|| descriptor.name.clone())
            .unwrap_or_else(|| format!("WAM Speaker at {}", descriptor.address));
        let model = text("model")
            .or_else(|| descriptor.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_owned());

        Self {
            id: descriptor.id.clone(),
            address: descriptor.address.clone(),
            port: descriptor.port,
            name,
            model,
            mac: or_unknown("mac"),
            version: or_unknown("version"),
            power: or_unknown("power"),
            volume: or_unknown("volume"),
            input: or_unknown("input"),
        }
    }
}

// ── DeviceSnapshot ──────────────────────────────────────────────────

/// One registry entry as seen by viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub id: DeviceId,
    pub address: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub state: LinkState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_token: Option<String>,
    pub properties: PropertyMap,
}

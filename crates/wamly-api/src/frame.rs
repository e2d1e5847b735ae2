//! Wire frames exchanged with a speaker.
//!
//! The socket carries one JSON object per line. Every frame is a
//! `(method, payload)` pair tagged with its [`FrameKind`]; frames coming
//! from the speaker may also carry the speaker's group token, which the
//! core uses to cluster speakers that play together.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Well-known methods ──────────────────────────────────────────────

/// Method names understood by WAM speakers.
pub mod methods {
    /// Sent right after the socket opens; the speaker must acknowledge it.
    pub const HANDSHAKE: &str = "N2X.Speaker.Hello";
    /// Requests a full property snapshot.
    pub const GET_STATE: &str = "N2X.Speaker.GetState";

    pub const SET_POWER: &str = "N2X.Speaker.SetPower";
    pub const SET_VOLUME: &str = "N2X.Speaker.SetVolume";
    pub const SET_MUTE: &str = "N2X.Speaker.SetMute";
    pub const PLAY: &str = "N2X.Speaker.Play";
    pub const PAUSE: &str = "N2X.Speaker.Pause";
    pub const STOP: &str = "N2X.Speaker.Stop";
    pub const NEXT: &str = "N2X.Speaker.Next";
    pub const PREV: &str = "N2X.Speaker.Prev";
    pub const SET_INPUT: &str = "N2X.Speaker.SetInput";
}

// ── ApiType ─────────────────────────────────────────────────────────

/// Which of the speaker's two API surfaces a call targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApiType {
    /// Speaker control (power, volume, inputs, grouping).
    #[default]
    Uic,
    /// Content playback (queues, radio, streaming services).
    Cpm,
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uic => f.write_str("UIC"),
            Self::Cpm => f.write_str("CPM"),
        }
    }
}

impl FromStr for ApiType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UIC" => Ok(Self::Uic),
            "CPM" => Ok(Self::Cpm),
            other => Err(Error::InvalidCall(format!(
                "unknown api type '{other}', expected UIC or CPM"
            ))),
        }
    }
}

// ── PropertyValue ───────────────────────────────────────────────────

/// A dynamically typed speaker property.
///
/// Speakers report strings, integers, and lists of integers (e.g. EQ
/// bands). On the wire the value is untagged JSON; in Rust the variant
/// keeps the original typing so `"10"` and `10` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    Text(String),
    IntegerList(Vec<i64>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[i64]> {
        match self {
            Self::IntegerList(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::IntegerList(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(v: Vec<i64>) -> Self {
        Self::IntegerList(v)
    }
}

/// Property name → value. Ordering carries no meaning; a `BTreeMap`
/// just keeps serialized snapshots stable.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

// ── ApiCall ─────────────────────────────────────────────────────────

/// A single named argument of an [`ApiCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    pub name: String,
    pub value: PropertyValue,
}

/// An outbound request before it is framed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCall {
    pub api_type: ApiType,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Arg>,
}

impl ApiCall {
    pub fn new(api_type: ApiType, method: impl Into<String>) -> Self {
        Self {
            api_type,
            method: method.into(),
            args: Vec::new(),
        }
    }

    /// Shorthand for a speaker-control (UIC) call.
    pub fn uic(method: impl Into<String>) -> Self {
        Self::new(ApiType::Uic, method)
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.args.push(Arg {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Reject calls the speaker could never accept.
    pub fn validate(&self) -> Result<(), Error> {
        if self.method.trim().is_empty() {
            return Err(Error::InvalidCall("method must not be empty".into()));
        }
        if self.method.chars().any(char::is_whitespace) {
            return Err(Error::InvalidCall(format!(
                "method '{}' must not contain whitespace",
                self.method
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for arg in &self.args {
            if arg.name.is_empty() {
                return Err(Error::InvalidCall(format!(
                    "{}: argument names must not be empty",
                    self.method
                )));
            }
            if !seen.insert(arg.name.as_str()) {
                return Err(Error::InvalidCall(format!(
                    "{}: duplicate argument '{}'",
                    self.method, arg.name
                )));
            }
        }
        Ok(())
    }
}

// ── Frame ───────────────────────────────────────────────────────────

/// Direction and role of a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// Controller → speaker.
    #[default]
    Request,
    /// Speaker acknowledgement of a request.
    Response,
    /// Unsolicited speaker notification.
    Event,
    /// Speaker rejected a request (malformed call, unsupported method).
    Error,
}

/// One line on the speaker socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub kind: FrameKind,

    #[serde(default)]
    pub api_type: ApiType,

    pub method: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payload: PropertyMap,

    /// Group token reported by the speaker. `None` leaves the known token
    /// untouched; an empty string means the speaker left its group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Human-readable reason on [`FrameKind::Error`] frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Frame {
    /// Frame an outbound call. Arguments become the payload.
    pub fn request(call: &ApiCall) -> Self {
        Self {
            kind: FrameKind::Request,
            api_type: call.api_type,
            method: call.method.clone(),
            payload: call
                .args
                .iter()
                .map(|a| (a.name.clone(), a.value.clone()))
                .collect(),
            group: None,
            error: None,
        }
    }

    pub fn response(method: impl Into<String>, payload: PropertyMap) -> Self {
        Self {
            kind: FrameKind::Response,
            api_type: ApiType::Uic,
            method: method.into(),
            payload,
            group: None,
            error: None,
        }
    }

    pub fn event(method: impl Into<String>, payload: PropertyMap) -> Self {
        Self {
            kind: FrameKind::Event,
            ..Self::response(method, payload)
        }
    }

    pub fn error(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Error,
            error: Some(message.into()),
            ..Self::response(method, PropertyMap::new())
        }
    }

    pub fn with_group(mut self, token: impl Into<String>) -> Self {
        self.group = Some(token.into());
        self
    }

    /// Whether this frame can acknowledge a request expecting `method`.
    /// Any speaker-originated frame counts; some methods are acknowledged
    /// by an event rather than a response.
    pub fn is_ack_for(&self, method: &str) -> bool {
        self.kind != FrameKind::Request && self.method == method
    }

    pub fn encode(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: format!("{self:?}"),
        })
    }

    pub fn decode(line: &str) -> Result<Self, Error> {
        serde_json::from_str(line).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: line.to_owned(),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────

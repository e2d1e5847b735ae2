// ── Command API ──
//
// Every speaker operation flows through the `Command` enum. Named
// commands map to fixed UIC calls; `Raw` passes an arbitrary call through
// after local validation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wamly_api::frame::methods;
use wamly_api::ApiCall;

use crate::error::CoreError;
use crate::link::CallOptions;

const DEFAULT_VOLUME: u8 = 10;
const MAX_VOLUME: u8 = 100;
const DEFAULT_INPUT: &str = "BT";

/// Names accepted by [`Command::parse`], in help order.
pub const COMMAND_NAMES: &[&str] = &[
    "power",
    "volume",
    "mute",
    "play",
    "pause",
    "stop",
    "next",
    "prev",
    "set_input",
];

/// An operation against one speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ── Speaker state ────────────────────────────────────────────────
    Power { on: bool },
    Volume { level: u8 },
    Mute { on: bool },
    SetInput { source: String },

    // ── Transport controls ───────────────────────────────────────────
    Play,
    Pause,
    Stop,
    Next,
    Prev,

    // ── Passthrough ──────────────────────────────────────────────────
    Raw {
        call: ApiCall,
        requires_power_on: bool,
        expected_response: Option<String>,
        /// Overrides the dispatcher's acknowledgement budget.
        timeout: Option<Duration>,
    },
}

impl Command {
    /// Build a command from its name and optional textual value, applying
    /// the defaults (`power on`, `volume 10`, `mute on`, `set_input BT`).
    pub fn parse(name: &str, value: Option<&str>) -> Result<Self, CoreError> {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "power" => Ok(Self::Power {
                on: parse_switch(&name, value)?,
            }),
            "volume" => Ok(Self::Volume {
                level: parse_volume(value)?,
            }),
            "mute" => Ok(Self::Mute {
                on: parse_switch(&name, value)?,
            }),
            "set_input" => Ok(Self::SetInput {
                source: value.unwrap_or(DEFAULT_INPUT).to_owned(),
            }),
            "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "stop" => Ok(Self::Stop),
            "next" => Ok(Self::Next),
            "prev" => Ok(Self::Prev),
            other => Err(CoreError::UnknownCommand {
                command: other.to_owned(),
            }),
        }
    }

    /// Wrap an arbitrary call with default options. Fails if the call is
    /// malformed. Use [`RawCall`] to set per-call options.
    pub fn raw(call: ApiCall) -> Result<Self, CoreError> {
        RawCall::new(call).into_command()
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Power { .. } => "power",
            Self::Volume { .. } => "volume",
            Self::Mute { .. } => "mute",
            Self::SetInput { .. } => "set_input",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Next => "next",
            Self::Prev => "prev",
            Self::Raw { call, .. } => &call.method,
        }
    }

    /// The wire call this command issues.
    pub fn to_call(&self) -> ApiCall {
        match self {
            Self::Power { on } => ApiCall::uic(methods::SET_POWER).with_arg("strValue", switch(*on)),
            Self::Volume { level } => {
                ApiCall::uic(methods::SET_VOLUME).with_arg("nVolume", i64::from(*level))
            }
            Self::Mute { on } => ApiCall::uic(methods::SET_MUTE).with_arg("strValue", switch(*on)),
            Self::SetInput { source } => {
                ApiCall::uic(methods::SET_INPUT).with_arg("strSource", source.as_str())
            }
            Self::Play => ApiCall::uic(methods::PLAY),
            Self::Pause => ApiCall::uic(methods::PAUSE),
            Self::Stop => ApiCall::uic(methods::STOP),
            Self::Next => ApiCall::uic(methods::NEXT),
            Self::Prev => ApiCall::uic(methods::PREV),
            Self::Raw { call, .. } => call.clone(),
        }
    }

    /// Send options for this command with the given acknowledgement budget.
    pub fn options(&self, timeout: Duration) -> CallOptions {
        match self {
            Self::Raw {
                requires_power_on,
                expected_response,
                timeout: own,
                ..
            } => CallOptions {
                requires_power_on: *requires_power_on,
                expected_response: expected_response.clone(),
                timeout: own.unwrap_or(timeout),
            },
            _ => CallOptions {
                requires_power_on: false,
                expected_response: None,
                timeout,
            },
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Power { on } | Self::Mute { on } => write!(f, "{} {}", self.name(), switch(*on)),
            Self::Volume { level } => write!(f, "volume {level}"),
            Self::SetInput { source } => write!(f, "set_input {source}"),
            _ => f.write_str(self.name()),
        }
    }
}

// ── RawCall ──────────────────────────────────────────────────────────

/// Builder for [`Command::Raw`].
#[derive(Debug, Clone)]
pub struct RawCall {
    call: ApiCall,
    requires_power_on: bool,
    expected_response: Option<String>,
    timeout: Option<Duration>,
}

impl RawCall {
    pub fn new(call: ApiCall) -> Self {
        Self {
            call,
            requires_power_on: false,
            expected_response: None,
            timeout: None,
        }
    }

    /// Power the speaker on before sending if it is not already on.
    pub fn power_on_first(mut self, yes: bool) -> Self {
        self.requires_power_on = yes;
        self
    }

    /// Wait for a frame with this method instead of the call's own.
    pub fn expect(mut self, method: impl Into<String>) -> Self {
        self.expected_response = Some(method.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn into_command(self) -> Result<Command, CoreError> {
        self.call.validate()?;
        let bad_expected = self
            .expected_response
            .as_deref()
            .filter(|m| m.trim().is_empty() || m.chars().any(char::is_whitespace));
        if let Some(expected) = bad_expected {
            return Err(CoreError::InvalidValue {
                command: self.call.method.clone(),
                value: expected.to_owned(),
                reason: "expected response must be a method name".into(),
            });
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(CoreError::InvalidValue {
                command: self.call.method.clone(),
                value: "0".into(),
                reason: "timeout must be greater than zero".into(),
            });
        }
        Ok(Command::Raw {
            call: self.call,
            requires_power_on: self.requires_power_on,
            expected_response: self.expected_response,
            timeout: self.timeout,
        })
    }
}

fn switch(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn parse_switch(command: &str, value: Option<&str>) -> Result<bool, CoreError> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("on" | "true" | "1") => Ok(true),
        Some("off" | "false" | "0") => Ok(false),
        Some(other) => Err(CoreError::InvalidValue {
            command: command.to_owned(),
            value: other.to_owned(),
            reason: "expected on or off".into(),
        }),
    }
}

fn parse_volume(value: Option<&str>) -> Result<u8, CoreError> {
    let Some(raw) = value else {
        return Ok(DEFAULT_VOLUME);
    };
    let invalid = |reason: String| CoreError::InvalidValue {
        command: "volume".into(),
        value: raw.to_owned(),
        reason,
    };
    let level: u8 = raw
        .parse()
        .map_err(|_| invalid(format!("expected an integer between 0 and {MAX_VOLUME}")))?;
    if level > MAX_VOLUME {
        return Err(invalid(format!("maximum volume is {MAX_VOLUME}")));
    }
    Ok(level)
}

// ── Target ───────────────────────────────────────────────────────────

/// Whether a command goes to one speaker or to its whole group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Device,
    Group,
}

impl FromStr for Target {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "device" => Ok(Self::Device),
            "group" => Ok(Self::Group),
            other => Err(CoreError::InvalidValue {
                command: "target".into(),
                value: other.to_owned(),
                reason: "expected device or group".into(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wamly_api::PropertyValue;

    #[test]
    fn defaults_apply_when_value_missing() {
        assert_eq!(Command::parse("power", None).unwrap(), Command::Power { on: true });
        assert_eq!(Command::parse("volume", None).unwrap(), Command::Volume { level: 10 });
        assert_eq!(Command::parse("mute", Some("")).unwrap(), Command::Mute { on: true });
        assert_eq!(
            Command::parse("set_input", None).unwrap(),
            Command::SetInput { source: "BT".into() }
        );
    }

    #[test]
    fn volume_maps_to_integer_arg() {
        let call = Command::parse("volume", Some("35")).unwrap().to_call();
        assert_eq!(call.method, "N2X.Speaker.SetVolume");
        assert_eq!(call.args.len(), 1);
        assert_eq!(call.args[0].name, "nVolume");
        assert_eq!(call.args[0].value, PropertyValue::Integer(35));
    }

    #[test]
    fn power_off_maps_to_string_arg() {
        let call = Command::parse("POWER", Some("off")).unwrap().to_call();
        assert_eq!(call.method, "N2X.Speaker.SetPower");
        assert_eq!(call.args[0].value, PropertyValue::Text("off".into()));
    }

    #[test]
    fn transport_controls_have_no_args() {
        for (name, method) in [
            ("play", methods::PLAY),
            ("pause", methods::PAUSE),
            ("stop", methods::STOP),
            ("next", methods::NEXT),
            ("prev", methods::PREV),
        ] {
            let call = Command::parse(name, None).unwrap().to_call();
            assert_eq!(call.method, method);
            assert!(call.args.is_empty());
        }
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            Command::parse("volume", Some("loud")),
            Err(CoreError::InvalidValue { .. })
        ));
        assert!(matches!(
            Command::parse("volume", Some("101")),
            Err(CoreError::InvalidValue { .. })
        ));
        assert!(matches!(
            Command::parse("mute", Some("maybe")),
            Err(CoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn unknown_command_is_reported() {
        match Command::parse("reboot", None) {
            Err(CoreError::UnknownCommand { command }) => assert_eq!(command, "reboot"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn raw_calls_are_validated() {
        assert!(Command::raw(ApiCall::uic("")).is_err());
        let cmd = Command::raw(ApiCall::uic("N2X.Speaker.GetMainInfo")).unwrap();
        assert_eq!(cmd.name(), "N2X.Speaker.GetMainInfo");
        assert!(!cmd.options(Duration::from_secs(1)).requires_power_on);
    }

    #[test]
    fn raw_call_options_override_defaults() {
        let cmd = RawCall::new(ApiCall::uic("N2X.Speaker.SetPreset").with_arg("nIndex", 2))
            .power_on_first(true)
            .expect("PresetChanged")
            .timeout(Duration::from_secs(12))
            .into_command()
            .unwrap();

        let options = cmd.options(Duration::from_secs(5));
        assert!(options.requires_power_on);
        assert_eq!(options.expected_response.as_deref(), Some("PresetChanged"));
        assert_eq!(options.timeout, Duration::from_secs(12));
        assert_eq!(cmd.to_call().args[0].value, PropertyValue::Integer(2));
    }

    #[test]
    fn raw_call_options_are_validated() {
        let call = || ApiCall::uic("N2X.Speaker.GetMainInfo");
        assert!(matches!(
            RawCall::new(call()).expect("Main Info").into_command(),
            Err(CoreError::InvalidValue { .. })
        ));
        assert!(matches!(
            RawCall::new(call()).timeout(Duration::ZERO).into_command(),
            Err(CoreError::InvalidValue { .. })
        ));
        let cmd = RawCall::new(call()).into_command().unwrap();
        assert_eq!(cmd.options(Duration::from_secs(3)).timeout, Duration::from_secs(3));
    }

    #[test]
    fn every_listed_name_parses() {
        for name in COMMAND_NAMES {
            assert!(Command::parse(name, None).is_ok(), "{name} should parse");
        }
    }

    #[test]
    fn target_parses() {
        assert_eq!("group".parse::<Target>().unwrap(), Target::Group);
        assert_eq!(" Device ".parse::<Target>().unwrap(), Target::Device);
        assert!("room".parse::<Target>().is_err());
    }
}

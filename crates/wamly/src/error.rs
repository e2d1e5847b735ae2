//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use wamly_config::ConfigError;
use wamly_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to speaker at {address}")]
    #[diagnostic(
        code(wamly::connection_failed),
        help(
            "Check that the speaker is powered and on the same network.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { address: String, reason: String },

    #[error("Speaker {device} is not connected")]
    #[diagnostic(
        code(wamly::not_connected),
        help("The session dropped while the command was in flight. Try again.")
    )]
    NotConnected { device: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(wamly::not_found),
        help("Run: wamly {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No speakers configured")]
    #[diagnostic(
        code(wamly::no_devices),
        help(
            "Add [[devices]] entries to {path}\n\
             Create a starter file with: wamly config init"
        )
    )]
    NoDevices { path: String },

    // ── Commands ─────────────────────────────────────────────────────

    #[error("Speaker rejected {method}: {message}")]
    #[diagnostic(code(wamly::rejected))]
    Rejected { method: String, message: String },

    #[error("{failed} of {total} group members failed")]
    #[diagnostic(
        code(wamly::group_partial),
        help("The failing members are listed above.")
    )]
    GroupPartial { failed: usize, total: usize },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wamly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(wamly::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(wamly::config))]
    Config(Box<figment::Error>),

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Speaker {device} did not answer within {millis}ms")]
    #[diagnostic(
        code(wamly::timeout),
        help("Increase the timeout with --timeout or check the speaker.")
    )]
    Timeout { device: String, millis: u64 },

    // ── Other ────────────────────────────────────────────────────────

    #[error("{0}")]
    #[diagnostic(code(wamly::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not encode output: {0}")]
    #[diagnostic(code(wamly::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotConnected { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } | Self::NoDevices { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ConfigExists { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Figment(err) => Self::Config(err),
            ConfigError::Io(err) => Self::Io(err),
            ConfigError::Serialization(err) => Self::Internal(err.to_string()),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Connect { address, reason } => Self::ConnectionFailed { address, reason },

            CoreError::NotConnected { device } => Self::NotConnected { device },

            CoreError::Timeout { device, timeout_ms } => Self::Timeout {
                device,
                millis: timeout_ms,
            },

            CoreError::DeviceNotFound { identifier } => Self::NotFound {
                resource_type: "speaker".into(),
                identifier,
                list_command: "devices".into(),
            },

            CoreError::GroupNotFound { identifier } => Self::NotFound {
                resource_type: "group for speaker".into(),
                identifier,
                list_command: "groups".into(),
            },

            CoreError::Rejected { method, message } => Self::Rejected { method, message },

            CoreError::UnknownCommand { command } => Self::Validation {
                field: "command".into(),
                reason: format!(
                    "unknown command '{command}', expected one of: {}",
                    wamly_core::command::COMMAND_NAMES.join(", ")
                ),
            },

            CoreError::InvalidValue {
                command,
                value,
                reason,
            } => Self::Validation {
                field: command,
                reason: format!("'{value}': {reason}"),
            },

            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::AlreadyConnected { identifier } => {
                Self::Internal(format!("speaker {identifier} is already connected"))
            }

            CoreError::Discovery { message } | CoreError::Internal(message) => {
                Self::Internal(message)
            }
        }
    }
}

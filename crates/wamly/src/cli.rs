//! Clap derive structures for the `wamly` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wamly -- control Samsung WAM speakers from the command line
#[derive(Debug, Parser)]
#[command(
    name = "wamly",
    version,
    about = "Control Samsung WAM speakers from the command line",
    long_about = "Connects to the speakers listed in the config file, keeps one\n\
        session per speaker, and sends commands to single speakers or to\n\
        whole speaker groups.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "WAMLY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WAMLY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Command acknowledgement timeout in milliseconds (overrides config)
    #[arg(long, env = "WAMLY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to every configured speaker and list them
    #[command(alias = "dev", alias = "d")]
    Devices,

    /// List speaker groups
    #[command(alias = "g")]
    Groups,

    /// Send a command to a speaker or its group
    #[command(alias = "s")]
    Send(SendArgs),

    /// Send a raw API call to a speaker or its group
    #[command(name = "send-api", alias = "api")]
    SendApi(SendApiArgs),

    /// Show details for one speaker
    #[command(alias = "i")]
    Info(InfoArgs),

    /// Stream live updates until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage the config file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Per-command arguments ────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Speaker id from the config file, or an IP address
    pub device: String,

    /// power, volume, mute, play, pause, stop, next, prev, set_input
    pub command: String,

    /// Command value (on/off, 0-100, input source)
    pub value: Option<String>,

    /// Send to every speaker grouped with DEVICE
    #[arg(long, short = 'g')]
    pub group: bool,
}

#[derive(Debug, Args)]
pub struct SendApiArgs {
    /// Speaker id from the config file, or an IP address
    pub device: String,

    /// API surface: UIC (speaker control) or CPM (content playback)
    pub api_type: String,

    /// Method name, e.g. N2X.Speaker.GetMainInfo
    pub method: String,

    /// Call argument; integer values are sent as numbers (repeatable)
    #[arg(long = "arg", short = 'a', value_name = "NAME=VALUE")]
    pub args: Vec<String>,

    /// Power the speaker on before sending
    #[arg(long)]
    pub pwron: bool,

    /// Method of the frame that acknowledges the call
    #[arg(long, value_name = "METHOD")]
    pub expect: Option<String>,

    /// Acknowledgement budget for this call in milliseconds
    #[arg(long, value_name = "MS")]
    pub call_timeout: Option<u64>,

    /// Send to every speaker grouped with DEVICE
    #[arg(long, short = 'g')]
    pub group: bool,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Speaker id from the config file, or an IP address
    pub device: String,

    /// Also show the most recent events
    #[arg(long, default_value = "0")]
    pub events: usize,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only watch these speakers (default: all configured)
    #[arg(long = "device", short = 'd')]
    pub devices: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}

//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod groups;
pub mod info;
pub mod send;
pub mod util;
pub mod watch;

use wamly_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a speaker-facing command to its handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::handle(controller, global).await,
        Command::Groups => groups::handle(controller, global).await,
        Command::Send(args) => send::handle(controller, args, global).await,
        Command::SendApi(args) => send::handle_api(controller, args, global).await,
        Command::Info(args) => info::handle(controller, args, global).await,
        Command::Watch(args) => watch::handle(controller, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need a controller".into(),
        )),
    }
}

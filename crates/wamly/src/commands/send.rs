//! `wamly send` and `wamly send-api`: run a command against a speaker or
//! its group.

use std::fmt::Write as _;
use std::time::Duration;

use wamly_core::{
    ApiCall, ApiType, Command, Controller, CoreError, DispatchOutcome, GroupResult, PropertyValue,
    RawCall, Target,
};

use crate::cli::{GlobalOpts, SendApiArgs, SendArgs};
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(outcome: &DispatchOutcome, command: &Command) -> String {
    let mut out = String::new();
    match outcome {
        DispatchOutcome::Device { device, response } => {
            let _ = writeln!(out, "{command} -> {device}: ok");
            for (key, value) in response {
                let _ = writeln!(out, "  {key:<12} {value}");
            }
        }
        DispatchOutcome::Group { anchor, result } => {
            let _ = writeln!(
                out,
                "{command} -> group of {anchor}: {}/{} ok",
                result.successes.len(),
                result.total()
            );
            for member in &result.successes {
                let _ = writeln!(out, "  {member:<16} ok");
            }
            for (member, reason) in &result.failures {
                let _ = writeln!(out, "  {member:<16} {reason}");
            }
        }
    }
    out.trim_end().to_owned()
}

fn summary(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Device { device, .. } => device.to_string(),
        DispatchOutcome::Group { result, .. } => result
            .successes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn partial_failure(result: &GroupResult) -> Option<CliError> {
    (!result.failures.is_empty()).then(|| CliError::GroupPartial {
        failed: result.failures.len(),
        total: result.total(),
    })
}

/// Split `NAME=VALUE`; values that parse as integers are sent as numbers.
fn parse_arg(raw: &str) -> Result<(String, PropertyValue), CliError> {
    let invalid = || CliError::Validation {
        field: "--arg".into(),
        reason: format!("expected NAME=VALUE, got '{raw}'"),
    };
    let (name, value) = raw.split_once('=').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    let value = value
        .parse::<i64>()
        .map_or_else(|_| PropertyValue::Text(value.to_owned()), PropertyValue::Integer);
    Ok((name.to_owned(), value))
}

fn raw_command(args: &SendApiArgs) -> Result<Command, CliError> {
    let api_type: ApiType = args.api_type.parse().map_err(CoreError::from)?;
    let mut call = ApiCall::new(api_type, args.method.trim());
    for raw in &args.args {
        let (name, value) = parse_arg(raw)?;
        call = call.with_arg(name, value);
    }

    let mut raw = RawCall::new(call).power_on_first(args.pwron);
    if let Some(expected) = &args.expect {
        raw = raw.expect(expected.trim());
    }
    if let Some(ms) = args.call_timeout {
        raw = raw.timeout(Duration::from_millis(ms));
    }
    raw.into_command().map_err(CliError::from)
}

pub async fn handle(
    controller: &Controller,
    args: SendArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Reject bad input before touching the network.
    let command = Command::parse(&args.command, args.value.as_deref())?;
    run(controller, &command, &args.device, args.group, global).await
}

pub async fn handle_api(
    controller: &Controller,
    args: SendApiArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let command = raw_command(&args)?;
    run(controller, &command, &args.device, args.group, global).await
}

async fn run(
    controller: &Controller,
    command: &Command,
    device: &str,
    group: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let descriptor = util::resolve(controller, device)?;
    let id = descriptor.id.clone();

    let target = if group {
        // Membership is derived from every reachable speaker.
        util::connect_all(controller, global).await?;
        if !controller.registry().contains(&id) {
            controller.connect_descriptor(descriptor).await?;
        }
        Target::Group
    } else {
        controller.connect_descriptor(descriptor).await?;
        Target::Device
    };

    let outcome = controller.execute(&id, command, target).await?;
    let out = output::render_single(global.output, &outcome, |o| detail(o, command), summary)?;
    output::print_output(&out, global.quiet);

    match &outcome {
        DispatchOutcome::Group { result, .. } => partial_failure(result).map_or(Ok(()), Err),
        DispatchOutcome::Device { .. } => Ok(()),
    }
}

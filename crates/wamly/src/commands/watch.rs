//! `wamly watch`: stream viewer messages until Ctrl-C.

use std::time::Duration;

use futures_util::future::join_all;
use tracing::{info, warn};

use wamly_core::{Controller, ViewerMessage};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

const MIN_PING_INTERVAL: Duration = Duration::from_secs(1);

/// One line per message for terminal use.
fn describe(message: &ViewerMessage) -> String {
    match message {
        ViewerMessage::Snapshot { devices, groups } => format!(
            "snapshot: {} speaker(s), {} group(s)",
            devices.len(),
            groups.len()
        ),
        ViewerMessage::PropertyUpdate { device, changed } => {
            let pairs: Vec<String> = changed.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{device}: {}", pairs.join(" "))
        }
        ViewerMessage::DeviceEvent { event } => {
            let status = if event.success { "ok" } else { "error" };
            format!("{}: {} {status}", event.device, event.method)
        }
        ViewerMessage::LinkState { device, state } => format!("{device}: {state}"),
        ViewerMessage::GroupsChanged { groups } => {
            let tokens: Vec<&str> = groups.iter().map(|g| g.token.as_str()).collect();
            format!("groups: [{}]", tokens.join(", "))
        }
        ViewerMessage::DeviceRemoved { device, reason } => format!("{device}: removed ({reason})"),
        ViewerMessage::Pong {
            device_count,
            connected,
        } => format!("pong: {}/{device_count} connected", connected.len()),
    }
}

fn render(format: OutputFormat, message: &ViewerMessage) -> Result<String, CliError> {
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(describe(message)),
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(message, true),
    }
}

pub async fn handle(
    controller: &Controller,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut viewer = controller.subscribe();

    if args.devices.is_empty() {
        util::connect_all(controller, global).await?;
    } else {
        let descriptors = args
            .devices
            .iter()
            .map(|raw| util::resolve(controller, raw))
            .collect::<Result<Vec<_>, _>>()?;
        for (descriptor, outcome) in descriptors.iter().zip(
            join_all(descriptors.iter().map(|d| controller.connect_descriptor(d.clone()))).await,
        ) {
            if let Err(e) = outcome {
                warn!(device = %descriptor.id, error = %e, "speaker unreachable");
            }
        }
    }

    let period = (controller.config().viewers.keepalive_timeout / 2).max(MIN_PING_INTERVAL);
    let mut ping = tokio::time::interval(period);
    ping.tick().await;

    info!(viewer = %viewer.id(), "watching, press Ctrl-C to stop");
    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            _ = ping.tick() => {
                controller.keep_alive(viewer.id());
            }
            message = viewer.recv() => {
                let Some(message) = message else {
                    warn!("dropped by the broadcaster");
                    break;
                };
                // Our own pongs carry nothing new.
                if matches!(*message, ViewerMessage::Pong { .. }) {
                    continue;
                }
                output::print_output(&render(global.output, &message)?, global.quiet);
            }
        }
    }

    controller.unsubscribe(viewer.id());
    Ok(())
}

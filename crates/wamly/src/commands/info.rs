//! `wamly info`: details and recent events for one speaker.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use wamly_core::{Controller, DeviceEvent, DeviceInfo};

use crate::cli::{GlobalOpts, InfoArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct InfoView {
    #[serde(flatten)]
    info: DeviceInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<Arc<DeviceEvent>>,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Received")]
    received: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&Arc<DeviceEvent>> for EventRow {
    fn from(e: &Arc<DeviceEvent>) -> Self {
        Self {
            received: e.received_at.format("%H:%M:%S%.3f").to_string(),
            kind: format!("{:?}", e.kind),
            method: e.method.clone(),
            result: if e.success {
                "ok".into()
            } else {
                e.error.clone().unwrap_or_else(|| "error".into())
            },
        }
    }
}

fn detail(view: &InfoView) -> String {
    let i = &view.info;
    [
        format!("ID:      {}", i.id),
        format!("Name:    {}", i.name),
        format!("Model:   {}", i.model),
        format!("Address: {}:{}", i.address, i.port),
        format!("MAC:     {}", i.mac),
        format!("Version: {}", i.version),
        format!("Power:   {}", i.power),
        format!("Volume:  {}", i.volume),
        format!("Input:   {}", i.input),
    ]
    .join("\n")
}

pub async fn handle(
    controller: &Controller,
    args: InfoArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let descriptor = util::resolve(controller, &args.device)?;
    let id = descriptor.id.clone();
    let info = util::connect_one(controller, descriptor).await?;
    let events = if args.events > 0 {
        controller.events(&id, args.events)?
    } else {
        Vec::new()
    };

    let view = InfoView { info, events };
    let mut out = output::render_single(global.output, &view, detail, |v| v.info.id.to_string())?;

    if matches!(global.output, OutputFormat::Table) && !view.events.is_empty() {
        out.push_str("\n\n");
        out.push_str(&output::render_list(
            OutputFormat::Table,
            &view.events,
            |e| EventRow::from(e),
            |e| e.method.clone(),
        )?);
    }
    output::print_output(&out, global.quiet);
    Ok(())
}

//! `wamly devices`: connect to every configured speaker and list them.

use serde::Serialize;
use tabled::Tabled;

use wamly_core::{Controller, DeviceId};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct DeviceStatus {
    id: DeviceId,
    address: String,
    port: u16,
    name: String,
    state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    power: String,
    volume: String,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Volume")]
    volume: String,
    #[tabled(rename = "Input")]
    input: String,
}

impl From<&DeviceStatus> for DeviceRow {
    fn from(d: &DeviceStatus) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            address: format!("{}:{}", d.address, d.port),
            state: d.state.clone(),
            group: d.group.clone().unwrap_or_else(|| "-".into()),
            power: d.power.clone(),
            volume: d.volume.clone(),
            input: d.input.clone(),
        }
    }
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let outcomes = util::connect_all(controller, global).await?;
    let snapshots = controller.devices();

    let statuses: Vec<DeviceStatus> = outcomes
        .into_iter()
        .map(|(descriptor, outcome)| match outcome {
            Ok(info) => {
                let snapshot = snapshots.iter().find(|s| s.id == info.id);
                DeviceStatus {
                    state: snapshot.map_or_else(|| "unknown".into(), |s| s.state.to_string()),
                    group: snapshot.and_then(|s| s.group_token.clone()),
                    id: info.id,
                    address: info.address,
                    port: info.port,
                    name: info.name,
                    power: info.power,
                    volume: info.volume,
                    input: info.input,
                    error: None,
                }
            }
            Err(e) => DeviceStatus {
                name: descriptor.name.clone().unwrap_or_else(|| "-".into()),
                id: descriptor.id,
                address: descriptor.address,
                port: descriptor.port,
                state: "unreachable".into(),
                group: None,
                power: "-".into(),
                volume: "-".into(),
                input: "-".into(),
                error: Some(e.to_string()),
            },
        })
        .collect();

    let out = output::render_list(global.output, &statuses, |d| DeviceRow::from(d), |d| {
        d.id.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

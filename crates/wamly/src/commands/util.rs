//! Session setup shared by the speaker-facing commands.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use wamly_api::{TcpTransport, Transport};
use wamly_config::Config;
use wamly_core::{Controller, CoreError, DeviceDescriptor, DeviceId, DeviceInfo, Discovery, StaticDiscovery};

use crate::cli::GlobalOpts;
use crate::error::CliError;

const STATE_POLL: Duration = Duration::from_millis(25);

/// The config file in effect: `--config`, then the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(wamly_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(wamly_config::load_config_from(&config_path(global))?)
}

/// Build a controller over TCP, fed by the config's device list.
pub async fn open_controller(global: &GlobalOpts) -> Result<Controller, CliError> {
    let config = load_config(global)?;
    let mut core = config.to_controller_config()?;
    if let Some(ms) = global.timeout {
        core.link.command_timeout = Duration::from_millis(ms);
    }

    let transport: Arc<dyn Transport> = Arc::new(TcpTransport::new(core.transport.clone()));
    let discovery: Arc<dyn Discovery> = Arc::new(StaticDiscovery::new(config.static_devices()));
    let controller = Controller::new(core, transport, discovery);
    controller.discover().await?;
    Ok(controller)
}

/// Find `raw` among configured speakers by id, then by address. A bare IP
/// address that is not configured is used as-is with the default port.
pub fn resolve(controller: &Controller, raw: &str) -> Result<DeviceDescriptor, CliError> {
    let known = controller.descriptors();
    let raw = raw.trim();
    if let Some(found) = known
        .iter()
        .find(|d| d.id.as_str() == raw)
        .or_else(|| known.iter().find(|d| d.address == raw))
    {
        return Ok(found.clone());
    }
    if raw.parse::<IpAddr>().is_ok() {
        return Ok(DeviceDescriptor::new(raw, controller.config().default_port));
    }
    Err(CoreError::DeviceNotFound {
        identifier: raw.to_owned(),
    }
    .into())
}

/// Connect one speaker and wait for its first state snapshot.
pub async fn connect_one(
    controller: &Controller,
    descriptor: DeviceDescriptor,
) -> Result<DeviceInfo, CliError> {
    let id = descriptor.id.clone();
    controller.connect_descriptor(descriptor).await?;
    wait_for_state(controller, &id).await;
    Ok(controller.device_info(&id)?)
}

/// Connect every configured speaker concurrently.
///
/// Returns each descriptor with its outcome, in config order. Fails only
/// when nothing is configured.
pub async fn connect_all(
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<Vec<(DeviceDescriptor, Result<DeviceInfo, CliError>)>, CliError> {
    let known = controller.descriptors();
    if known.is_empty() {
        return Err(CliError::NoDevices {
            path: config_path(global).display().to_string(),
        });
    }

    let outcomes = join_all(
        known
            .iter()
            .map(|d| connect_one(controller, d.clone())),
    )
    .await;

    Ok(known
        .iter()
        .cloned()
        .zip(outcomes)
        .inspect(|(d, outcome)| {
            if let Err(e) = outcome {
                warn!(device = %d.id, error = %e, "speaker unreachable");
            }
        })
        .collect())
}

/// Give the speaker one command timeout to answer the snapshot request.
async fn wait_for_state(controller: &Controller, id: &DeviceId) {
    let budget = controller.config().link.command_timeout;
    let waited = tokio::time::timeout(budget, async {
        loop {
            match controller.current_properties(id) {
                Ok(props) if !props.is_empty() => return,
                Ok(_) => tokio::time::sleep(STATE_POLL).await,
                Err(_) => return,
            }
        }
    })
    .await;
    if waited.is_err() {
        debug!(device = %id, "no state snapshot before timeout");
    }
}

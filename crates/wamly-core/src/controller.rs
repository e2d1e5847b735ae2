// ── Controller facade ──
//
// The single entry point for consumers. Wires the registry, group index,
// dispatcher, and broadcaster together and runs two background tasks:
// the update pump, which turns `LinkUpdate`s into viewer messages, and
// the reaper, which drops idle viewers.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wamly_api::{PropertyMap, Transport};

use crate::broadcast::{Broadcaster, Viewer, ViewerId, ViewerMessage};
use crate::command::{Command, RawCall, Target};
use crate::config::ControllerConfig;
use crate::discovery::Discovery;
use crate::dispatch::Dispatcher;
use crate::error::CoreError;
use crate::group::{self, GroupIndex};
use crate::link::LinkUpdate;
use crate::model::{
    DeviceDescriptor, DeviceEvent, DeviceId, DeviceInfo, DeviceSnapshot, Group, GroupResult,
};
use crate::registry::Registry;

const MIN_REAP_INTERVAL: Duration = Duration::from_secs(1);

// ── DispatchOutcome ──────────────────────────────────────────────

/// Result of [`Controller::send_command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Device {
        device: DeviceId,
        /// Payload of the acknowledging frame.
        response: PropertyMap,
    },
    Group {
        anchor: DeviceId,
        #[serde(flatten)]
        result: GroupResult,
    },
}

// ── Controller ───────────────────────────────────────────────────

/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    registry: Arc<Registry>,
    groups: GroupIndex,
    dispatcher: Dispatcher,
    broadcaster: Arc<Broadcaster>,
    discovery: Arc<dyn Discovery>,
    descriptors: ArcSwap<Vec<DeviceDescriptor>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Build a controller and start its background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: ControllerConfig,
        transport: Arc<dyn Transport>,
        discovery: Arc<dyn Discovery>,
    ) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Registry::new(config.link.clone(), transport, update_tx));
        let groups = GroupIndex::new(Arc::clone(&registry));
        let dispatcher = Dispatcher::new(Arc::clone(&registry), config.link.command_timeout);
        let broadcaster = Arc::new(Broadcaster::new(config.viewers.clone()));
        let cancel = CancellationToken::new();

        let pump = tokio::spawn(update_pump(
            update_rx,
            Arc::clone(&registry),
            groups.clone(),
            Arc::clone(&broadcaster),
            cancel.clone(),
        ));
        let reap_interval = (config.viewers.keepalive_timeout / 2).max(MIN_REAP_INTERVAL);
        let reaper = tokio::spawn(reaper_task(
            Arc::clone(&broadcaster),
            reap_interval,
            cancel.clone(),
        ));

        Self {
            inner: Arc::new(ControllerInner {
                config,
                registry,
                groups,
                dispatcher,
                broadcaster,
                discovery,
                descriptors: ArcSwap::from_pointee(Vec::new()),
                cancel,
                task_handles: Mutex::new(vec![pump, reaper]),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    // ── Discovery ────────────────────────────────────────────────

    /// Run discovery and replace the descriptor cache with its result.
    pub async fn discover(&self) -> Result<Vec<DeviceDescriptor>, CoreError> {
        let found = self.inner.discovery.discover().await?;
        info!(count = found.len(), "discovery finished");
        self.inner.descriptors.store(Arc::new(found.clone()));
        Ok(found)
    }

    /// Descriptors from the last discovery pass.
    pub fn descriptors(&self) -> Arc<Vec<DeviceDescriptor>> {
        self.inner.descriptors.load_full()
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to a speaker. Name and model come from the descriptor cache
    /// when discovery knows the id; `port` falls back to the cached port
    /// and then to the default API port.
    pub async fn connect(
        &self,
        id: &DeviceId,
        address: &str,
        port: Option<u16>,
    ) -> Result<DeviceInfo, CoreError> {
        let cached = self
            .inner
            .descriptors
            .load()
            .iter()
            .find(|d| &d.id == id)
            .cloned();

        let descriptor = DeviceDescriptor {
            id: id.clone(),
            address: address.to_owned(),
            port: port
                .or_else(|| cached.as_ref().map(|d| d.port))
                .unwrap_or(self.inner.config.default_port),
            name: cached.as_ref().and_then(|d| d.name.clone()),
            model: cached.and_then(|d| d.model),
        };
        self.connect_descriptor(descriptor).await
    }

    pub async fn connect_descriptor(&self, descriptor: DeviceDescriptor) -> Result<DeviceInfo, CoreError> {
        let link = self.inner.registry.connect(descriptor).await?;
        Ok(link.info())
    }

    /// Disconnect and forget a speaker. Returns whether it was live.
    ///
    /// Viewers learn about the removal through the update pump, after the
    /// link's last state change.
    pub async fn disconnect(&self, id: &DeviceId) -> bool {
        self.inner.registry.remove(id).await
    }

    /// Disconnect everything. Returns the ids that were live.
    pub async fn disconnect_all(&self) -> Vec<DeviceId> {
        self.inner.registry.disconnect_all().await
    }

    /// Disconnect every speaker and stop the background tasks.
    pub async fn shutdown(&self) {
        let ids = self.disconnect_all().await;
        debug!(count = ids.len(), "links closed");
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Parse and run a named command against a device or its group.
    pub async fn send_command(
        &self,
        id: &DeviceId,
        command: &str,
        value: Option<&str>,
        target: Target,
    ) -> Result<DispatchOutcome, CoreError> {
        let command = Command::parse(command, value)?;
        self.execute(id, &command, target).await
    }

    /// Send an arbitrary API call with its own options.
    pub async fn send_api(
        &self,
        id: &DeviceId,
        raw: RawCall,
        target: Target,
    ) -> Result<DispatchOutcome, CoreError> {
        let command = raw.into_command()?;
        self.execute(id, &command, target).await
    }

    pub async fn execute(
        &self,
        id: &DeviceId,
        command: &Command,
        target: Target,
    ) -> Result<DispatchOutcome, CoreError> {
        match target {
            Target::Device => {
                let ack = self.inner.dispatcher.send_to_device(id, command).await?;
                Ok(DispatchOutcome::Device {
                    device: id.clone(),
                    response: ack.payload,
                })
            }
            Target::Group => {
                let result = self.inner.dispatcher.send_to_group(id, command).await?;
                Ok(DispatchOutcome::Group {
                    anchor: id.clone(),
                    result,
                })
            }
        }
    }

    // ── Viewers ──────────────────────────────────────────────────

    pub fn subscribe(&self) -> Viewer {
        let registry = &self.inner.registry;
        self.inner.broadcaster.subscribe(|| {
            let links = registry.snapshot();
            ViewerMessage::Snapshot {
                devices: links.iter().map(crate::link::DeviceLink::snapshot).collect(),
                groups: group::cluster(&links),
            }
        })
    }

    pub fn unsubscribe(&self, viewer: ViewerId) -> bool {
        self.inner.broadcaster.unsubscribe(viewer)
    }

    /// Answer a viewer ping with a pong listing connected speakers.
    pub fn keep_alive(&self, viewer: ViewerId) -> bool {
        let links = self.inner.registry.snapshot();
        let connected = links
            .iter()
            .filter(|link| link.state().is_connected())
            .map(|link| link.id().clone())
            .collect();
        let pong = ViewerMessage::Pong {
            device_count: links.len(),
            connected,
        };
        self.inner.broadcaster.keep_alive(viewer, pong)
    }

    pub fn viewer_count(&self) -> usize {
        self.inner.broadcaster.viewer_count()
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn current_properties(&self, id: &DeviceId) -> Result<Arc<PropertyMap>, CoreError> {
        Ok(self.inner.registry.lookup(id)?.properties())
    }

    /// Newest events first, at most `limit`.
    pub fn events(&self, id: &DeviceId, limit: usize) -> Result<Vec<Arc<DeviceEvent>>, CoreError> {
        Ok(self.inner.registry.lookup(id)?.events(limit))
    }

    pub fn device_info(&self, id: &DeviceId) -> Result<DeviceInfo, CoreError> {
        Ok(self.inner.registry.lookup(id)?.info())
    }

    pub fn devices(&self) -> Vec<DeviceSnapshot> {
        self.inner
            .registry
            .snapshot()
            .iter()
            .map(crate::link::DeviceLink::snapshot)
            .collect()
    }

    pub fn groups(&self) -> Vec<Group> {
        self.inner.groups.groups()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Turn link updates into viewer messages and keep derived groups fresh.
async fn update_pump(
    mut updates: mpsc::UnboundedReceiver<LinkUpdate>,
    registry: Arc<Registry>,
    groups: GroupIndex,
    broadcaster: Arc<Broadcaster>,
    cancel: CancellationToken,
) {
    let mut pump = Pump {
        last_groups: groups.groups(),
        registry,
        groups,
        broadcaster,
    };

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Deliver what shutdown itself queued, such as removals.
                while let Ok(update) = updates.try_recv() {
                    pump.handle(update);
                }
                break;
            }
            update = updates.recv() => match update {
                Some(update) => pump.handle(update),
                None => break,
            },
        }
    }
}

struct Pump {
    registry: Arc<Registry>,
    groups: GroupIndex,
    broadcaster: Arc<Broadcaster>,
    last_groups: Vec<Group>,
}

impl Pump {
    fn handle(&mut self, update: LinkUpdate) {
        let regroup = match update {
            LinkUpdate::StateChanged { device, state } => {
                self.broadcaster.publish(ViewerMessage::LinkState { device, state });
                true
            }
            LinkUpdate::Properties { device, changed } => {
                self.broadcaster.publish(ViewerMessage::PropertyUpdate { device, changed });
                false
            }
            LinkUpdate::Event(event) => {
                self.broadcaster.publish(ViewerMessage::DeviceEvent { event });
                false
            }
            LinkUpdate::GroupTokenChanged { .. } => true,
            LinkUpdate::Failed {
                device,
                instance,
                reason,
            } => {
                warn!(device = %device, reason = %reason, "link failed permanently");
                // Removal waits on the per-id lock; never stall the pump on it.
                // The registry reports back with `Removed`.
                let registry = Arc::clone(&self.registry);
                tokio::spawn(async move {
                    registry.remove_failed(&device, instance, reason).await;
                });
                false
            }
            LinkUpdate::Removed { device, reason } => {
                self.broadcaster.publish(ViewerMessage::DeviceRemoved { device, reason });
                true
            }
        };

        if regroup {
            let current = self.groups.groups();
            if current != self.last_groups {
                debug!(groups = current.len(), "group membership changed");
                self.broadcaster.publish(ViewerMessage::GroupsChanged {
                    groups: current.clone(),
                });
                self.last_groups = current;
            }
        }
    }
}

async fn reaper_task(broadcaster: Arc<Broadcaster>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let reaped = broadcaster.reap_idle();
                if !reaped.is_empty() {
                    debug!(count = reaped.len(), "reaped idle viewers");
                }
            }
        }
    }
}

// ── Update broadcaster ──
//
// Fans messages out to every subscribed viewer. Each viewer gets its own
// bounded queue fed with `try_send`: a viewer that cannot keep up is
// dropped instead of slowing everyone else down. Viewers hold no device
// state of their own; snapshots are built from the registry on demand.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use wamly_api::PropertyMap;

use crate::config::ViewerConfig;
use crate::link::LinkState;
use crate::model::{DeviceEvent, DeviceId, DeviceSnapshot, Group};

// ── ViewerId ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(Uuid);

impl ViewerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── ViewerMessage ────────────────────────────────────────────────────

/// Everything a viewer can receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerMessage {
    /// Full state. Always the first message a viewer sees.
    Snapshot {
        devices: Vec<DeviceSnapshot>,
        groups: Vec<Group>,
    },
    PropertyUpdate {
        device: DeviceId,
        changed: PropertyMap,
    },
    DeviceEvent {
        event: Arc<DeviceEvent>,
    },
    LinkState {
        device: DeviceId,
        #[serde(flatten)]
        state: LinkState,
    },
    GroupsChanged {
        groups: Vec<Group>,
    },
    DeviceRemoved {
        device: DeviceId,
        reason: String,
    },
    /// Reply to a viewer keep-alive.
    Pong {
        device_count: usize,
        connected: Vec<DeviceId>,
    },
}

// ── Viewer ───────────────────────────────────────────────────────────

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct Viewer {
    id: ViewerId,
    rx: mpsc::Receiver<Arc<ViewerMessage>>,
}

impl Viewer {
    pub fn id(&self) -> ViewerId {
        self.id
    }

    /// Next message, or `None` once the broadcaster dropped this viewer.
    pub async fn recv(&mut self) -> Option<Arc<ViewerMessage>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<ViewerMessage>> {
        self.rx.try_recv().ok()
    }
}

// ── Broadcaster ──────────────────────────────────────────────────────

struct ViewerSlot {
    tx: mpsc::Sender<Arc<ViewerMessage>>,
    last_seen: Instant,
    keepalive_failures: u32,
}

pub struct Broadcaster {
    viewers: Mutex<HashMap<ViewerId, ViewerSlot>>,
    config: ViewerConfig,
}

impl Broadcaster {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            viewers: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ViewerId, ViewerSlot>> {
        self.viewers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a viewer and queue `snapshot()` as its first message.
    ///
    /// The snapshot is built while publishing is blocked, so no incremental
    /// message can slip in ahead of it or fall between the two.
    pub fn subscribe<F>(&self, snapshot: F) -> Viewer
    where
        F: FnOnce() -> ViewerMessage,
    {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let id = ViewerId::new();

        let mut viewers = self.lock();
        if tx.try_send(Arc::new(snapshot())).is_err() {
            // Unreachable with a fresh queue of capacity >= 1.
            warn!(viewer = %id, "could not queue initial snapshot");
        }
        viewers.insert(
            id,
            ViewerSlot {
                tx,
                last_seen: Instant::now(),
                keepalive_failures: 0,
            },
        );
        info!(viewer = %id, viewers = viewers.len(), "viewer subscribed");
        Viewer { id, rx }
    }

    /// Queue `message` for every viewer without waiting. Viewers whose queue
    /// is full or closed are dropped. Returns how many viewers received it.
    pub fn publish(&self, message: ViewerMessage) -> usize {
        let message = Arc::new(message);
        let mut viewers = self.lock();
        viewers.retain(|id, slot| match slot.tx.try_send(Arc::clone(&message)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(viewer = %id, "viewer queue full, dropping viewer");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(viewer = %id, "viewer went away");
                false
            }
        });
        viewers.len()
    }

    /// Record a keep-alive from `id` and queue `pong` in reply.
    ///
    /// Returns `false` if the viewer is unknown or was dropped because its
    /// pongs kept failing.
    pub fn keep_alive(&self, id: ViewerId, pong: ViewerMessage) -> bool {
        let mut viewers = self.lock();
        let Some(slot) = viewers.get_mut(&id) else {
            return false;
        };
        slot.last_seen = Instant::now();

        let keep = match slot.tx.try_send(Arc::new(pong)) {
            Ok(()) => {
                slot.keepalive_failures = 0;
                true
            }
            Err(TrySendError::Full(_)) => {
                slot.keepalive_failures += 1;
                debug!(viewer = %id, failures = slot.keepalive_failures, "pong not delivered");
                slot.keepalive_failures < self.config.max_keepalive_failures
            }
            Err(TrySendError::Closed(_)) => false,
        };
        if !keep {
            viewers.remove(&id);
            info!(viewer = %id, "viewer dropped after failed keep-alive");
        }
        keep
    }

    /// Remove a viewer. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ViewerId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(viewer = %id, "viewer unsubscribed");
        }
        removed
    }

    /// Drop viewers that have not sent a keep-alive within the timeout.
    pub fn reap_idle(&self) -> Vec<ViewerId> {
        let timeout = self.config.keepalive_timeout;
        let mut reaped = Vec::new();
        self.lock().retain(|id, slot| {
            let alive = slot.last_seen.elapsed() <= timeout;
            if !alive {
                reaped.push(*id);
            }
            alive
        });
        for id in &reaped {
            info!(viewer = %id, "idle viewer reaped");
        }
        reaped
    }

    pub fn viewer_count(&self) -> usize {
        self.lock().len()
    }
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("viewers", &self.viewer_count())
            .finish_non_exhaustive()
    }
}

// ── Device registry ──
//
// Maps device ids to their `DeviceLink`. Mutations for one id are
// serialised through a per-id async lock; reads over many ids work on a
// point-in-time snapshot and never hold a map shard across I/O.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use futures_util::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use wamly_api::Transport;

use crate::config::LinkConfig;
use crate::error::CoreError;
use crate::link::{DeviceLink, LinkUpdate};
use crate::model::{DeviceDescriptor, DeviceId};

struct Entry {
    /// Insertion sequence; also the link's instance number.
    seq: u64,
    link: DeviceLink,
}

/// Owner of every `DeviceLink`. At most one live link per id.
pub struct Registry {
    entries: DashMap<DeviceId, Entry>,
    locks: DashMap<DeviceId, Arc<Mutex<()>>>,
    sequence: AtomicU64,
    config: LinkConfig,
    transport: Arc<dyn Transport>,
    updates: mpsc::UnboundedSender<LinkUpdate>,
}

impl Registry {
    pub fn new(
        config: LinkConfig,
        transport: Arc<dyn Transport>,
        updates: mpsc::UnboundedSender<LinkUpdate>,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            locks: DashMap::new(),
            sequence: AtomicU64::new(1),
            config,
            transport,
            updates,
        }
    }

    fn lock_for(&self, id: &DeviceId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(id.clone()).or_default().value())
    }

    /// Forget the per-id lock once nobody else holds or waits on it.
    fn release_lock(&self, id: &DeviceId) {
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn announce_removal(&self, id: &DeviceId, reason: String) {
        let _ = self.updates.send(LinkUpdate::Removed {
            device: id.clone(),
            reason,
        });
    }

    fn new_link(&self, descriptor: DeviceDescriptor) -> (u64, DeviceLink) {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let link = DeviceLink::new(
            descriptor,
            seq,
            self.config.clone(),
            Arc::clone(&self.transport),
            self.updates.clone(),
        );
        (seq, link)
    }

    /// Create a link for `descriptor`, replacing a prior entry only if that
    /// entry has settled in `Disconnected`.
    pub fn register(&self, descriptor: DeviceDescriptor) -> Result<DeviceLink, CoreError> {
        match self.entries.entry(descriptor.id.clone()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().link.state().is_live() {
                    return Err(CoreError::AlreadyConnected {
                        identifier: descriptor.id.to_string(),
                    });
                }
                let (seq, link) = self.new_link(descriptor);
                debug!(device = %link.id(), instance = seq, "replacing disconnected link");
                occupied.insert(Entry {
                    seq,
                    link: link.clone(),
                });
                Ok(link)
            }
            MapEntry::Vacant(vacant) => {
                let (seq, link) = self.new_link(descriptor);
                vacant.insert(Entry {
                    seq,
                    link: link.clone(),
                });
                Ok(link)
            }
        }
    }

    /// Register and connect in one step. On failure the entry is dropped
    /// again so a failed attempt leaves no trace.
    pub async fn connect(&self, descriptor: DeviceDescriptor) -> Result<DeviceLink, CoreError> {
        let id = descriptor.id.clone();
        let lock = self.lock_for(&id);
        let result = {
            let _guard = lock.lock().await;
            self.connect_locked(descriptor).await
        };
        drop(lock);
        self.release_lock(&id);
        result
    }

    async fn connect_locked(&self, descriptor: DeviceDescriptor) -> Result<DeviceLink, CoreError> {
        let link = self.register(descriptor)?;
        if let Err(e) = link.connect().await {
            let instance = link.instance();
            if self
                .entries
                .remove_if(link.id(), |_, entry| entry.link.instance() == instance)
                .is_some()
            {
                debug!(device = %link.id(), "entry dropped after failed connect");
            }
            return Err(e);
        }
        Ok(link)
    }

    pub fn lookup(&self, id: &DeviceId) -> Result<DeviceLink, CoreError> {
        self.entries
            .get(id)
            .map(|entry| entry.link.clone())
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: id.to_string(),
            })
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.entries.contains_key(id)
    }

    /// Disconnect and forget `id`. Returns whether the link was live.
    /// Unknown ids are a no-op.
    ///
    /// A removed entry is announced with `LinkUpdate::Removed`, queued
    /// after the link's final state change.
    pub async fn remove(&self, id: &DeviceId) -> bool {
        let lock = self.lock_for(id);
        let was_live = {
            let _guard = lock.lock().await;
            self.remove_locked(id).await
        };
        drop(lock);
        self.release_lock(id);
        was_live
    }

    async fn remove_locked(&self, id: &DeviceId) -> bool {
        let Some((_, entry)) = self.entries.remove(id) else {
            return false;
        };
        let was_live = entry.link.state().is_live();
        entry.link.disconnect().await;
        info!(device = %id, "device removed");
        self.announce_removal(id, "disconnected".to_owned());
        was_live
    }

    /// Drop `id` only if its current link is the given instance. Used when
    /// a link reports terminal failure, so a newer link is never touched.
    ///
    /// Takes no per-id lock: the instance check is atomic on the map, and a
    /// connect in progress for the same id must not hold this up.
    pub async fn remove_failed(&self, id: &DeviceId, instance: u64, reason: String) -> bool {
        let Some((_, entry)) = self
            .entries
            .remove_if(id, |_, entry| entry.link.instance() == instance)
        else {
            return false;
        };
        entry.link.disconnect().await;
        info!(device = %id, instance, "failed link dropped");
        self.announce_removal(id, reason);
        true
    }

    /// Remove every entry. Returns the ids whose link was live right before
    /// the call, in insertion order.
    pub async fn disconnect_all(&self) -> Vec<DeviceId> {
        let links: Vec<(DeviceLink, bool)> = self
            .snapshot()
            .into_iter()
            .map(|link| {
                let live = link.state().is_live();
                (link, live)
            })
            .collect();

        join_all(links.iter().map(|(link, _)| self.remove(link.id()))).await;

        links
            .into_iter()
            .filter(|(_, live)| *live)
            .map(|(link, _)| link.id().clone())
            .collect()
    }

    /// Point-in-time list of links, in insertion order.
    pub fn snapshot(&self) -> Vec<DeviceLink> {
        let mut entries: Vec<(u64, DeviceLink)> = self
            .entries
            .iter()
            .map(|entry| (entry.seq, entry.link.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, link)| link).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids with a connect or remove in flight.
    pub fn busy_ids(&self) -> usize {
        self.locks.len()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

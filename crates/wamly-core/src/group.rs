// ── Group index ──
//
// Groups are never stored. Every call re-derives them from the
// registry's current links, so membership can never go stale.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::CoreError;
use crate::link::DeviceLink;
use crate::model::{DeviceId, Group};
use crate::registry::Registry;

/// Cluster connected links by group token.
///
/// Links that are not `Connected` or report no token are skipped.
/// Clusters keep the order in which their first member appears, and
/// single-member clusters are not groups.
pub fn cluster(links: &[DeviceLink]) -> Vec<Group> {
    let mut by_token: IndexMap<String, Vec<DeviceId>> = IndexMap::new();
    for link in links {
        if !link.state().is_connected() {
            continue;
        }
        let Some(token) = link.group_token().filter(|t| !t.is_empty()) else {
            continue;
        };
        by_token.entry(token).or_default().push(link.id().clone());
    }

    by_token
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .filter_map(|(token, members)| {
            let anchor = members.first()?.clone();
            Some(Group {
                anchor,
                token,
                members,
            })
        })
        .collect()
}

/// Read-only view deriving groups from a [`Registry`].
#[derive(Debug, Clone)]
pub struct GroupIndex {
    registry: Arc<Registry>,
}

impl GroupIndex {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn groups(&self) -> Vec<Group> {
        cluster(&self.registry.snapshot())
    }

    /// The group containing `member`, which serves as the group's anchor.
    pub fn resolve(&self, member: &DeviceId) -> Result<Group, CoreError> {
        self.groups()
            .into_iter()
            .find(|group| group.contains(member))
            .ok_or_else(|| CoreError::GroupNotFound {
                identifier: member.to_string(),
            })
    }
}

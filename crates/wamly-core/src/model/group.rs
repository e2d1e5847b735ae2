use serde::{Deserialize, Serialize};

use super::device::DeviceId;

/// Speakers that currently share a group token.
///
/// Groups carry no identity of their own. `anchor` is simply the first
/// member in registry order and any member id resolves to the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub anchor: DeviceId,
    pub token: String,
    pub members: Vec<DeviceId>,
}

impl Group {
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.members.contains(id)
    }
}

/// Per-member outcome of a group fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResult {
    pub successes: Vec<DeviceId>,
    pub failures: Vec<(DeviceId, String)>,
}

impl GroupResult {
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

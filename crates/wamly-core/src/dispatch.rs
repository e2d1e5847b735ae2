// ── Command dispatch ──
//
// Routes a `Command` to one link or fans it out across a group. Group
// membership is fixed when the fan-out starts; members that join or
// leave mid-dispatch do not change who receives the command.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};
use wamly_api::Frame;

use crate::command::Command;
use crate::error::CoreError;
use crate::group::GroupIndex;
use crate::model::{DeviceId, GroupResult};
use crate::registry::Registry;

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    groups: GroupIndex,
    timeout: Duration,
}

impl Dispatcher {
    /// `timeout` is the per-device acknowledgement budget.
    pub fn new(registry: Arc<Registry>, timeout: Duration) -> Self {
        Self {
            groups: GroupIndex::new(Arc::clone(&registry)),
            registry,
            timeout,
        }
    }

    pub async fn send_to_device(&self, id: &DeviceId, command: &Command) -> Result<Frame, CoreError> {
        let link = self.registry.lookup(id)?;
        let call = command.to_call();
        debug!(device = %id, command = %command, "dispatching");
        link.send_command(&call, &command.options(self.timeout)).await
    }

    /// Send `command` to every member of the group containing `anchor`.
    ///
    /// Never fails on member errors; each one lands in
    /// [`GroupResult::failures`]. Returns once every member has answered
    /// or timed out.
    pub async fn send_to_group(&self, anchor: &DeviceId, command: &Command) -> Result<GroupResult, CoreError> {
        let group = self.groups.resolve(anchor)?;
        debug!(
            anchor = %anchor,
            token = %group.token,
            members = group.members.len(),
            command = %command,
            "group dispatch"
        );

        let outcomes = join_all(group.members.iter().map(|member| async move {
            let outcome = self.send_to_device(member, command).await;
            (member.clone(), outcome)
        }))
        .await;

        let mut result = GroupResult::default();
        for (member, outcome) in outcomes {
            match outcome {
                Ok(_) => result.successes.push(member),
                Err(e) => {
                    warn!(device = %member, error = %e, "group member failed");
                    result.failures.push((member, e.to_string()));
                }
            }
        }
        Ok(result)
    }
}

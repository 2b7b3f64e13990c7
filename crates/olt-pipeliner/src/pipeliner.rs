//! The pipeliner instance: entry points, group reconciliation, and the
//! expiry sweeper.

use crate::config::PipelinerConfig;
use crate::dispatch::OperationDispatcher;
use crate::pending::PendingGroupCache;
use log::{debug, error, warn};
use olt_flow::{
    ContextHandle, FlowRuleService, GroupBucket, GroupDescription, GroupEvent, GroupEventKind,
    GroupKey, GroupService, GroupType, NextGroupRecord, NextObjective, NextType, ObjectiveError,
    ObjectiveId, ObjectiveOp, ObjectiveStore,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Translates flow objectives for one OLT device.
///
/// Classification and rule building are synchronous and side-effect free
/// up to the final dispatch; the pipeliner holds no shared mutable state
/// apart from the pending-group cache. Entry points must run inside a
/// tokio runtime, because batch completion is delivered from a spawned
/// task.
pub struct OltPipeliner {
    pub(crate) config: PipelinerConfig,
    pub(crate) groups: Arc<dyn GroupService>,
    pub(crate) store: Arc<dyn ObjectiveStore>,
    pub(crate) dispatcher: OperationDispatcher,
    pub(crate) pending: PendingGroupCache,
}

impl OltPipeliner {
    /// Creates a pipeliner for the device named in `config`.
    pub fn new(
        config: PipelinerConfig,
        flow_rules: Arc<dyn FlowRuleService>,
        groups: Arc<dyn GroupService>,
        store: Arc<dyn ObjectiveStore>,
    ) -> Self {
        let pending = PendingGroupCache::new(config.pending_group_ttl);
        Self {
            dispatcher: OperationDispatcher::new(flow_rules),
            groups,
            store,
            pending,
            config,
        }
    }

    /// Returns this instance's configuration.
    pub fn config(&self) -> &PipelinerConfig {
        &self.config
    }

    /// Translates a next objective into a broadcast group request.
    ///
    /// Returns as soon as the request is submitted and the pending entry
    /// recorded; the objective settles later through
    /// [`handle_group_event`](Self::handle_group_event) or TTL expiry. A
    /// repeated call with the same id supersedes the unresolved earlier
    /// request silently.
    pub async fn next(&self, next: NextObjective) {
        let context = next.context.clone();

        if next.next_type != NextType::Broadcast {
            error!("only broadcast groups are supported: {}", next);
            return fail(&context, ObjectiveError::BadParams);
        }
        if next.treatments.len() != 1 {
            error!("only singleton broadcast groups are supported: {}", next);
            return fail(&context, ObjectiveError::BadParams);
        }

        let bucket = GroupBucket::all(next.treatments[0].clone());
        let key = GroupKey::from_next_id(next.id);
        let (id, op, app_id) = (next.id, next.op, next.app_id);

        let token = self.pending.insert(key.clone(), next);

        let submission = match op {
            ObjectiveOp::Add => {
                let desc = GroupDescription {
                    device: self.config.device.clone(),
                    group_type: GroupType::All,
                    buckets: vec![bucket],
                    key: key.clone(),
                    app_id,
                };
                self.groups.create_group(desc).await
            }
            ObjectiveOp::Remove => self.groups.delete_group(&self.config.device, &key, app_id).await,
            ObjectiveOp::AddToExisting => {
                self.groups
                    .add_buckets(&self.config.device, &key, vec![bucket], app_id)
                    .await
            }
            ObjectiveOp::RemoveFromExisting => {
                self.groups
                    .remove_buckets(&self.config.device, &key, vec![bucket], app_id)
                    .await
            }
        };

        if let Err(e) = submission {
            warn!("group request submission failed for next objective {}: {}", id, e);
            // Settle only our own entry; a superseding request keeps its
            // pending state.
            if let Some(objective) = self.pending.remove_if_current(&key, token) {
                fail(&objective.context, ObjectiveError::GroupInstallationFailed);
            }
        }
    }

    /// Consumes a group lifecycle event.
    ///
    /// An added/updated event whose correlation key matches a pending
    /// entry persists the next-id association, signals success, and
    /// settles the entry. Events with no matching entry are ignored, so
    /// duplicate and late confirmations are harmless.
    pub fn handle_group_event(&self, event: &GroupEvent) {
        match event.kind {
            GroupEventKind::Added | GroupEventKind::Updated => {}
            _ => return,
        }

        if let Some(objective) = self.pending.resolve(event.key()) {
            debug!(
                "group {} confirmed for next objective {}",
                event.key(),
                objective.id
            );
            let record = NextGroupRecord::new(event.key().clone());
            self.store.put_next_group(objective.id, record.encode());
            pass(&objective.context);
        }
    }

    /// Fails every pending entry whose TTL has elapsed.
    pub fn expire_pending(&self) {
        for (key, objective) in self.pending.expire(Instant::now()) {
            warn!(
                "pending group {} for next objective {} expired unconfirmed",
                key, objective.id
            );
            fail(&objective.context, ObjectiveError::GroupInstallationFailed);
        }
    }

    /// Spawns the background sweeper driving [`expire_pending`](Self::expire_pending).
    pub fn spawn_expiry_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let pipeliner = Arc::clone(self);
        let period = self.config.expiry_sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                pipeliner.expire_pending();
            }
        })
    }

    /// Spawns a task draining group events from `events` into
    /// [`handle_group_event`](Self::handle_group_event). The task ends
    /// when the sender side closes.
    pub fn spawn_group_listener(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<GroupEvent>,
    ) -> JoinHandle<()> {
        let pipeliner = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                pipeliner.handle_group_event(&event);
            }
        })
    }

    /// Resolves the persisted group key for a next id.
    pub(crate) fn group_key_for_next(&self, next_id: ObjectiveId) -> Option<GroupKey> {
        let bytes = self.store.get_next_group(next_id)?;
        match NextGroupRecord::decode(&bytes) {
            Ok(record) => Some(record.into_key()),
            Err(e) => {
                warn!("stored group record for next id {} is unreadable: {}", next_id, e);
                None
            }
        }
    }
}

/// Signals success to an objective's context, if it has one.
pub(crate) fn pass(context: &Option<ContextHandle>) {
    if let Some(ctx) = context {
        ctx.on_success();
    }
}

/// Signals failure to an objective's context, if it has one.
pub(crate) fn fail(context: &Option<ContextHandle>, error: ObjectiveError) {
    if let Some(ctx) = context {
        ctx.on_error(error);
    }
}

//! Contracts of the hardware subsystems the translator hands work to.
//!
//! None of these are implemented here; the flow-rule and group subsystems
//! live in the device driver stack, and the objective store in the
//! controller core. The translator only relies on the request/response
//! shapes below.

use crate::flow::FlowRuleBatch;
use crate::group::{Group, GroupBucket, GroupDescription, GroupKey};
use crate::objective::ObjectiveId;
use crate::AppId;
use async_trait::async_trait;

/// Failure reported by the flow-rule subsystem.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FlowRuleError {
    /// The device rejected the batch.
    #[error("flow rule batch rejected: {0}")]
    Rejected(String),

    /// The device is not reachable.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Failure reported by the group subsystem on request submission.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GroupError {
    /// The device rejected the request.
    #[error("group request rejected: {0}")]
    Rejected(String),

    /// The device is not reachable.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Programs flow rules on a device.
///
/// A batch is atomic: `apply` resolves `Ok` only when every operation in
/// the batch is confirmed, and `Err` on any failure. Implementations
/// resolve the future exactly once per batch.
#[async_trait]
pub trait FlowRuleService: Send + Sync {
    /// Applies a batch of rule operations.
    async fn apply(&self, batch: FlowRuleBatch) -> Result<(), FlowRuleError>;
}

/// Programs hardware groups on a device.
///
/// The `Result` of the mutating calls covers request *submission* only;
/// installation is confirmed later through a group lifecycle event
/// carrying the request's correlation key.
#[async_trait]
pub trait GroupService: Send + Sync {
    /// Requests creation of a group.
    async fn create_group(&self, desc: GroupDescription) -> Result<(), GroupError>;

    /// Requests deletion of the group with the given key.
    async fn delete_group(
        &self,
        device: &str,
        key: &GroupKey,
        app_id: AppId,
    ) -> Result<(), GroupError>;

    /// Requests adding buckets to an existing group.
    async fn add_buckets(
        &self,
        device: &str,
        key: &GroupKey,
        buckets: Vec<GroupBucket>,
        app_id: AppId,
    ) -> Result<(), GroupError>;

    /// Requests removing buckets from an existing group.
    async fn remove_buckets(
        &self,
        device: &str,
        key: &GroupKey,
        buckets: Vec<GroupBucket>,
        app_id: AppId,
    ) -> Result<(), GroupError>;

    /// Looks up an installed group by its correlation key.
    fn get_group(&self, device: &str, key: &GroupKey) -> Option<Group>;
}

/// Persists next-id to group-key associations for the translator.
///
/// The stored bytes are opaque to the store; the translator owns the
/// encoding (see [`crate::NextGroupRecord`]).
pub trait ObjectiveStore: Send + Sync {
    /// Records the group association for a next id, replacing any prior
    /// record.
    fn put_next_group(&self, next_id: ObjectiveId, record: Vec<u8>);

    /// Returns the recorded association for a next id.
    fn get_next_group(&self, next_id: ObjectiveId) -> Option<Vec<u8>>;
}

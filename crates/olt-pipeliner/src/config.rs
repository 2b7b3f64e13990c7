//! Per-instance pipeliner configuration.

use olt_flow::{DeviceId, TableId};
use std::time::Duration;

/// Configuration for one [`OltPipeliner`](crate::OltPipeliner) instance.
///
/// One instance serves one device; nothing here is shared process-wide.
#[derive(Debug, Clone)]
pub struct PipelinerConfig {
    /// Device this pipeliner programs.
    pub device: DeviceId,
    /// Second-stage table where the outer (QinQ) tag is handled.
    pub qinq_table: TableId,
    /// Priority of the default-drop rule installed by the any-VLAN
    /// upstream path.
    pub no_action_priority: u32,
    /// How long a requested group may stay unconfirmed before its
    /// objective is failed.
    pub pending_group_ttl: Duration,
    /// How often the expiry sweeper scans the pending-group cache.
    pub expiry_sweep_interval: Duration,
}

impl PipelinerConfig {
    /// Default second-stage table index.
    pub const DEFAULT_QINQ_TABLE: TableId = 1;

    /// Default priority for the any-VLAN default-drop rule.
    pub const DEFAULT_NO_ACTION_PRIORITY: u32 = 500;

    /// Default pending-group time-to-live.
    pub const DEFAULT_PENDING_GROUP_TTL: Duration = Duration::from_secs(20);

    /// Default sweep interval.
    pub const DEFAULT_EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

    /// Creates a configuration for `device` with default table layout and
    /// timing.
    pub fn new(device: impl Into<DeviceId>) -> Self {
        Self {
            device: device.into(),
            qinq_table: Self::DEFAULT_QINQ_TABLE,
            no_action_priority: Self::DEFAULT_NO_ACTION_PRIORITY,
            pending_group_ttl: Self::DEFAULT_PENDING_GROUP_TTL,
            expiry_sweep_interval: Self::DEFAULT_EXPIRY_SWEEP_INTERVAL,
        }
    }

    /// Overrides the pending-group time-to-live.
    pub fn with_pending_group_ttl(mut self, ttl: Duration) -> Self {
        self.pending_group_ttl = ttl;
        self
    }
}

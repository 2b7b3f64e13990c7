//! Hardware groups, correlation keys, and lifecycle events.

use crate::flow::{AppId, DeviceId};
use crate::treatment::TrafficTreatment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware-assigned group identifier.
pub type GroupId = u32;

/// Opaque correlation key linking a hardware group to the next-objective
/// that requested it.
///
/// Keys derived from a next-objective id are stable across processes, so a
/// restarted translator resolves the same key for the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey(Vec<u8>);

impl GroupKey {
    /// Derives the key for a next-objective id.
    pub fn from_next_id(id: u32) -> Self {
        GroupKey(id.to_be_bytes().to_vec())
    }

    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        GroupKey(bytes)
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Recovers the next-objective id this key was derived from, if it
    /// has the derived shape.
    pub fn next_id(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.0.as_slice().try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Group type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupType {
    /// Replicate to every bucket (broadcast/multicast).
    All,
    /// Load-balance across buckets.
    Select,
    /// Single-bucket indirection.
    Indirect,
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupType::All => write!(f, "ALL"),
            GroupType::Select => write!(f, "SELECT"),
            GroupType::Indirect => write!(f, "INDIRECT"),
        }
    }
}

/// A single group bucket: the treatment applied to one replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBucket {
    /// Instructions applied to packets taking this bucket.
    pub treatment: TrafficTreatment,
}

impl GroupBucket {
    /// Creates a bucket for an all-type (broadcast) group.
    pub fn all(treatment: TrafficTreatment) -> Self {
        Self { treatment }
    }
}

/// A request to create a hardware group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescription {
    /// Device the group is created on.
    pub device: DeviceId,
    /// Group type.
    pub group_type: GroupType,
    /// Buckets, in order.
    pub buckets: Vec<GroupBucket>,
    /// Correlation key echoed back in lifecycle events.
    pub key: GroupKey,
    /// Owning application.
    pub app_id: AppId,
}

/// A group as reported by the hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Hardware-assigned identifier, referenced by flow-rule actions.
    pub id: GroupId,
    /// Correlation key supplied at creation.
    pub key: GroupKey,
}

/// Kind of a group lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupEventKind {
    /// The group was installed.
    Added,
    /// The group's buckets were updated.
    Updated,
    /// The group was removed.
    Removed,
    /// The group operation failed in hardware.
    Failed,
}

/// A group lifecycle event emitted by the group subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEvent {
    /// What happened.
    pub kind: GroupEventKind,
    /// The group the event concerns.
    pub group: Group,
}

impl GroupEvent {
    /// Creates an event.
    pub fn new(kind: GroupEventKind, group: Group) -> Self {
        Self { kind, group }
    }

    /// Returns the event's correlation key.
    pub fn key(&self) -> &GroupKey {
        &self.group.key
    }
}

/// The persisted association from a next-objective id to its group key.
///
/// Written to the objective store only after the group is confirmed in
/// hardware; the byte encoding is internal to the translator and must
/// round-trip the key exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextGroupRecord {
    key: GroupKey,
}

impl NextGroupRecord {
    /// Creates a record for the given key.
    pub fn new(key: GroupKey) -> Self {
        Self { key }
    }

    /// Returns the recorded key.
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// Consumes the record, returning the key.
    pub fn into_key(self) -> GroupKey {
        self.key
    }

    /// Encodes the record for the objective store.
    pub fn encode(&self) -> Vec<u8> {
        // Infallible: the record is a plain byte-vector wrapper.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decodes a record previously produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

//! Device-independent flow objective model for the OLT pipeline.
//!
//! This crate defines the declarative intents the pipeline translator
//! consumes, the concrete rule/group descriptions it produces, and the
//! contracts of the hardware subsystems it hands them to:
//!
//! 1. Applications submit [`FilteringObjective`], [`ForwardingObjective`],
//!    and [`NextObjective`] intents.
//! 2. The translator turns them into table-indexed [`FlowRule`]s (batched
//!    into an atomic [`FlowRuleBatch`]) and broadcast [`GroupDescription`]s.
//! 3. The [`FlowRuleService`] and [`GroupService`] program the device and
//!    report completion; group confirmation arrives later as a
//!    [`GroupEvent`].
//! 4. Each objective's single pass/fail outcome is delivered through its
//!    [`ObjectiveContext`].
//!
//! # Key Components
//!
//! - [`TrafficSelector`] / [`Criterion`]: match-field sets
//! - [`TrafficTreatment`] / [`Instruction`]: two-phase instruction lists
//!   (immediate and deferred partitions, hardware execution contract)
//! - [`GroupKey`]: the opaque correlation key linking a hardware group to
//!   the next-objective that requested it
//! - [`NextGroupRecord`]: the persisted next-id to group-key association

mod criteria;
mod flow;
mod group;
mod objective;
mod services;
mod treatment;

pub use criteria::{Criterion, CriterionKind, TrafficSelector, TrafficSelectorBuilder};
pub use flow::{AppId, DeviceId, FlowRule, FlowRuleBatch, FlowRuleBatchBuilder, FlowRuleOp, MeterId, TableId};
pub use group::{
    Group, GroupBucket, GroupDescription, GroupEvent, GroupEventKind, GroupId, GroupKey,
    GroupType, NextGroupRecord,
};
pub use objective::{
    ContextHandle, FilterType, FilteringObjective, ForwardingObjective, NextObjective, NextType,
    ObjectiveContext, ObjectiveError, ObjectiveId, ObjectiveOp,
};
pub use services::{FlowRuleError, FlowRuleService, GroupError, GroupService, ObjectiveStore};
pub use treatment::{Instruction, TrafficTreatment, TreatmentBuilder};

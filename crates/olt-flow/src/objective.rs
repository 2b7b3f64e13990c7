//! Flow objectives: the declarative intents submitted to the translator.

use crate::criteria::{Criterion, CriterionKind, TrafficSelector};
use crate::flow::AppId;
use crate::treatment::TrafficTreatment;
use std::fmt;
use std::sync::Arc;

/// Next-objective identifier.
pub type ObjectiveId = u32;

/// Operation requested by an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveOp {
    /// Install the translated entries.
    Add,
    /// Remove the translated entries.
    Remove,
    /// Extend an existing group with the given members.
    AddToExisting,
    /// Shrink an existing group by the given members.
    RemoveFromExisting,
}

impl fmt::Display for ObjectiveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveOp::Add => write!(f, "ADD"),
            ObjectiveOp::Remove => write!(f, "REMOVE"),
            ObjectiveOp::AddToExisting => write!(f, "ADD_TO_EXISTING"),
            ObjectiveOp::RemoveFromExisting => write!(f, "REMOVE_FROM_EXISTING"),
        }
    }
}

/// Whether a filtering objective admits or blocks the matched traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Admit: install the punt rule.
    Permit,
    /// Block: remove the punt rule.
    Deny,
}

/// Grouping discipline of a next objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextType {
    /// Replicate to all members.
    Broadcast,
    /// Single member.
    Simple,
    /// Load-balance across members.
    Hashed,
    /// Primary/backup members.
    Failover,
}

impl fmt::Display for NextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextType::Broadcast => write!(f, "BROADCAST"),
            NextType::Simple => write!(f, "SIMPLE"),
            NextType::Hashed => write!(f, "HASHED"),
            NextType::Failover => write!(f, "FAILOVER"),
        }
    }
}

/// Failure kinds surfaced to an objective's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ObjectiveError {
    /// Structurally invalid or underspecified objective.
    #[error("bad objective parameters")]
    BadParams,

    /// Valid objective outside this pipeline's supported feature set.
    #[error("unsupported by this pipeline")]
    Unsupported,

    /// A required group lookup could not be resolved.
    #[error("referenced group is missing")]
    GroupMissing,

    /// A requested group was never confirmed by hardware.
    #[error("group installation failed")]
    GroupInstallationFailed,

    /// The flow-rule batch was rejected by the device.
    #[error("flow installation failed")]
    FlowInstallationFailed,
}

/// Completion callback attached to an objective.
///
/// The translator invokes exactly one of these methods exactly once per
/// objective lifecycle. For a [`NextObjective`] the call is made only
/// after group-event resolution or pending-entry expiry, never while
/// `next()` is still executing.
pub trait ObjectiveContext: Send + Sync {
    /// The objective was fully translated and installed.
    fn on_success(&self) {}

    /// The objective failed; `error` names the failure kind.
    fn on_error(&self, error: ObjectiveError) {
        let _ = error;
    }
}

/// Shared handle to an objective's completion context.
pub type ContextHandle = Arc<dyn ObjectiveContext>;

fn fmt_context(context: &Option<ContextHandle>) -> &'static str {
    if context.is_some() {
        "set"
    } else {
        "unset"
    }
}

/// An intent to punt (or stop punting) control-plane traffic.
#[derive(Clone)]
pub struct FilteringObjective {
    /// The port scope of the filter; must be an in-port criterion.
    pub key: Criterion,
    /// Additional match conditions (ether type, IP protocol, UDP ports).
    pub conditions: Vec<Criterion>,
    /// Treatment applied to matched traffic; must output to the controller.
    pub meta: Option<TrafficTreatment>,
    /// Permit installs, deny removes.
    pub filter_type: FilterType,
    /// Rule priority.
    pub priority: u32,
    /// Owning application.
    pub app_id: AppId,
    /// Completion callback.
    pub context: Option<ContextHandle>,
}

impl FilteringObjective {
    /// Creates a permit objective scoped to `key`.
    pub fn permit(key: Criterion) -> Self {
        Self::new(FilterType::Permit, key)
    }

    /// Creates a deny objective scoped to `key`.
    pub fn deny(key: Criterion) -> Self {
        Self::new(FilterType::Deny, key)
    }

    fn new(filter_type: FilterType, key: Criterion) -> Self {
        Self {
            key,
            conditions: Vec::new(),
            meta: None,
            filter_type,
            priority: 0,
            app_id: 0,
            context: None,
        }
    }

    /// Adds a match condition.
    pub fn with_condition(mut self, condition: Criterion) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Sets the meta treatment.
    pub fn with_meta(mut self, meta: TrafficTreatment) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the owning application.
    pub fn from_app(mut self, app_id: AppId) -> Self {
        self.app_id = app_id;
        self
    }

    /// Attaches the completion context.
    pub fn with_context(mut self, context: ContextHandle) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns the first condition of the given kind, if present.
    pub fn condition(&self, kind: CriterionKind) -> Option<&Criterion> {
        self.conditions.iter().find(|c| c.kind() == kind)
    }
}

impl fmt::Debug for FilteringObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteringObjective")
            .field("key", &self.key)
            .field("conditions", &self.conditions)
            .field("meta", &self.meta)
            .field("filter_type", &self.filter_type)
            .field("priority", &self.priority)
            .field("app_id", &self.app_id)
            .field("context", &fmt_context(&self.context))
            .finish()
    }
}

impl fmt::Display for FilteringObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FilteringObjective({:?}, key={}, conditions={}, priority={})",
            self.filter_type,
            self.key,
            self.conditions.len(),
            self.priority
        )
    }
}

/// An intent to forward a class of traffic, possibly rewriting VLAN tags.
#[derive(Clone)]
pub struct ForwardingObjective {
    /// Match criteria.
    pub selector: TrafficSelector,
    /// Ordered instruction list describing the rewrite and output.
    pub treatment: TrafficTreatment,
    /// Requested operation.
    pub op: ObjectiveOp,
    /// Rule priority.
    pub priority: u32,
    /// Owning application.
    pub app_id: AppId,
    /// Group indirection for multicast forwards.
    pub next_id: Option<ObjectiveId>,
    /// Completion callback.
    pub context: Option<ContextHandle>,
}

impl ForwardingObjective {
    /// Creates a forwarding objective for the given operation.
    pub fn new(op: ObjectiveOp) -> Self {
        Self {
            selector: TrafficSelector::default(),
            treatment: TrafficTreatment::empty(),
            op,
            priority: 0,
            app_id: 0,
            next_id: None,
            context: None,
        }
    }

    /// Sets the selector.
    pub fn with_selector(mut self, selector: TrafficSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Sets the treatment.
    pub fn with_treatment(mut self, treatment: TrafficTreatment) -> Self {
        self.treatment = treatment;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the owning application.
    pub fn from_app(mut self, app_id: AppId) -> Self {
        self.app_id = app_id;
        self
    }

    /// References a next objective's group.
    pub fn with_next_id(mut self, next_id: ObjectiveId) -> Self {
        self.next_id = Some(next_id);
        self
    }

    /// Attaches the completion context.
    pub fn with_context(mut self, context: ContextHandle) -> Self {
        self.context = Some(context);
        self
    }
}

impl fmt::Debug for ForwardingObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardingObjective")
            .field("selector", &self.selector)
            .field("treatment", &self.treatment)
            .field("op", &self.op)
            .field("priority", &self.priority)
            .field("app_id", &self.app_id)
            .field("next_id", &self.next_id)
            .field("context", &fmt_context(&self.context))
            .finish()
    }
}

impl fmt::Display for ForwardingObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ForwardingObjective(op={}, priority={}, next_id={:?}, selector={})",
            self.op, self.priority, self.next_id, self.selector
        )
    }
}

/// An intent to create or mutate a next-hop group.
#[derive(Clone)]
pub struct NextObjective {
    /// Identifier the group's correlation key is derived from.
    pub id: ObjectiveId,
    /// Grouping discipline; only broadcast is supported by this pipeline.
    pub next_type: NextType,
    /// Member treatments.
    pub treatments: Vec<TrafficTreatment>,
    /// Requested operation.
    pub op: ObjectiveOp,
    /// Owning application.
    pub app_id: AppId,
    /// Completion callback.
    pub context: Option<ContextHandle>,
}

impl NextObjective {
    /// Creates a next objective.
    pub fn new(id: ObjectiveId, next_type: NextType, op: ObjectiveOp) -> Self {
        Self {
            id,
            next_type,
            treatments: Vec::new(),
            op,
            app_id: 0,
            context: None,
        }
    }

    /// Adds a member treatment.
    pub fn add_treatment(mut self, treatment: TrafficTreatment) -> Self {
        self.treatments.push(treatment);
        self
    }

    /// Sets the owning application.
    pub fn from_app(mut self, app_id: AppId) -> Self {
        self.app_id = app_id;
        self
    }

    /// Attaches the completion context.
    pub fn with_context(mut self, context: ContextHandle) -> Self {
        self.context = Some(context);
        self
    }
}

impl fmt::Debug for NextObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NextObjective")
            .field("id", &self.id)
            .field("next_type", &self.next_type)
            .field("treatments", &self.treatments)
            .field("op", &self.op)
            .field("app_id", &self.app_id)
            .field("context", &fmt_context(&self.context))
            .finish()
    }
}

impl fmt::Display for NextObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NextObjective(id={}, type={}, op={}, members={})",
            self.id,
            self.next_type,
            self.op,
            self.treatments.len()
        )
    }
}

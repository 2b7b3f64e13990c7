//! Flow rules and atomic rule batches.

use crate::criteria::TrafficSelector;
use crate::treatment::TrafficTreatment;
use std::fmt;

/// Pipeline table index.
pub type TableId = u32;

/// Meter identifier.
pub type MeterId = u32;

/// Application identifier, stamped on rules and groups for ownership.
pub type AppId = u16;

/// Device identifier.
pub type DeviceId = String;

/// A table-indexed hardware forwarding entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRule {
    /// Device this rule is installed on.
    pub device: DeviceId,
    /// Owning application.
    pub app_id: AppId,
    /// Pipeline table the rule lives in.
    pub table: TableId,
    /// Match priority; higher wins.
    pub priority: u32,
    /// Match criteria.
    pub selector: TrafficSelector,
    /// Instructions applied on match.
    pub treatment: TrafficTreatment,
}

impl FlowRule {
    /// Creates a rule in table 0 with empty selector and treatment.
    pub fn new(device: impl Into<DeviceId>, app_id: AppId) -> Self {
        Self {
            device: device.into(),
            app_id,
            table: 0,
            priority: 0,
            selector: TrafficSelector::default(),
            treatment: TrafficTreatment::empty(),
        }
    }

    /// Sets the table.
    pub fn for_table(mut self, table: TableId) -> Self {
        self.table = table;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
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
}

impl fmt::Display for FlowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FlowRule(device={}, table={}, priority={}, selector={}, treatment={})",
            self.device, self.table, self.priority, self.selector, self.treatment
        )
    }
}

/// A rule paired with the batch operation applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowRuleOp {
    /// Install the rule.
    Add(FlowRule),
    /// Remove the rule.
    Remove(FlowRule),
}

impl FlowRuleOp {
    /// Returns the rule this operation carries.
    pub fn rule(&self) -> &FlowRule {
        match self {
            FlowRuleOp::Add(rule) | FlowRuleOp::Remove(rule) => rule,
        }
    }

    /// Returns true for an add operation.
    pub fn is_add(&self) -> bool {
        matches!(self, FlowRuleOp::Add(_))
    }
}

/// An ordered set of rule operations submitted to the device atomically.
///
/// The batch succeeds or fails as a whole; there are no partial-success
/// semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowRuleBatch {
    ops: Vec<FlowRuleOp>,
}

impl FlowRuleBatch {
    /// Returns a new batch builder.
    pub fn builder() -> FlowRuleBatchBuilder {
        FlowRuleBatchBuilder::default()
    }

    /// Returns the operations in submission order.
    pub fn ops(&self) -> &[FlowRuleOp] {
        &self.ops
    }

    /// Returns the number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the batch carries no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Builder for [`FlowRuleBatch`].
#[derive(Debug, Clone, Default)]
pub struct FlowRuleBatchBuilder {
    ops: Vec<FlowRuleOp>,
}

impl FlowRuleBatchBuilder {
    /// Appends an add operation.
    pub fn add(mut self, rule: FlowRule) -> Self {
        self.ops.push(FlowRuleOp::Add(rule));
        self
    }

    /// Appends a remove operation.
    pub fn remove(mut self, rule: FlowRule) -> Self {
        self.ops.push(FlowRuleOp::Remove(rule));
        self
    }

    /// Builds the batch.
    pub fn build(self) -> FlowRuleBatch {
        FlowRuleBatch { ops: self.ops }
    }
}

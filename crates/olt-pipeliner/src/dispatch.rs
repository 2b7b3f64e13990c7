//! Batches translated rules and relays the single batch outcome.

use log::{debug, warn};
use olt_flow::{
    ContextHandle, FlowRule, FlowRuleBatch, FlowRuleService, ObjectiveError, ObjectiveOp,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Submits rule batches to the flow-rule subsystem and delivers each
/// batch's outcome to the originating objective's context exactly once.
///
/// A batch is all-or-nothing; no partial-success is surfaced.
pub struct OperationDispatcher {
    flow_rules: Arc<dyn FlowRuleService>,
}

impl OperationDispatcher {
    /// Creates a dispatcher submitting to `flow_rules`.
    pub fn new(flow_rules: Arc<dyn FlowRuleService>) -> Self {
        Self { flow_rules }
    }

    /// Tags `rules` as one add or remove operation set per `op` and
    /// submits it.
    ///
    /// The group-membership ops carry no rule operations; their empty
    /// batch still completes and signals the context once.
    pub fn submit(
        &self,
        op: ObjectiveOp,
        rules: Vec<FlowRule>,
        context: Option<ContextHandle>,
    ) -> JoinHandle<()> {
        let mut builder = FlowRuleBatch::builder();
        match op {
            ObjectiveOp::Add => {
                for rule in rules {
                    builder = builder.add(rule);
                }
            }
            ObjectiveOp::Remove => {
                for rule in rules {
                    builder = builder.remove(rule);
                }
            }
            ObjectiveOp::AddToExisting | ObjectiveOp::RemoveFromExisting => {
                debug!("{} carries no rule operations", op);
            }
        }
        self.apply(builder.build(), context)
    }

    /// Submits `batch`; the context receives exactly one outcome, from
    /// whatever task the flow-rule subsystem completes on.
    pub fn apply(&self, batch: FlowRuleBatch, context: Option<ContextHandle>) -> JoinHandle<()> {
        let service = Arc::clone(&self.flow_rules);
        tokio::spawn(async move {
            match service.apply(batch).await {
                Ok(()) => {
                    if let Some(ctx) = context {
                        ctx.on_success();
                    }
                }
                Err(e) => {
                    warn!("flow rule batch failed: {}", e);
                    if let Some(ctx) = context {
                        ctx.on_error(ObjectiveError::FlowInstallationFailed);
                    }
                }
            }
        })
    }
}

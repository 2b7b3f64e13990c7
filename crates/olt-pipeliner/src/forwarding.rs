//! Forwarding objective translation: passthrough, upstream QinQ tagging,
//! downstream QinQ stripping, and multicast group indirection.

use crate::pipeliner::{fail, OltPipeliner};
use log::{debug, error};
use olt_flow::{
    FlowRule, ForwardingObjective, Instruction, ObjectiveError, TrafficSelector, TrafficTreatment,
};
use olt_types::{EtherType, PortNumber, VlanId};

/// A VLAN tag operation extracted from a treatment: the push or pop
/// instruction and the VLAN ID set alongside it.
type VlanOpPair = (Instruction, VlanId);

/// Packs an inner VLAN ID and an output port into the 64-bit metadata
/// value carried between the two pipeline stages.
pub(crate) fn pack_metadata(inner_vlan: VlanId, output: PortNumber) -> u64 {
    ((inner_vlan.raw() as u64) << 32) | (output.as_u64() & 0xFFFF_FFFF)
}

/// Recovers the (inner VLAN code, output port) pair from a packed
/// metadata value.
pub(crate) fn unpack_metadata(metadata: u64) -> (u16, u64) {
    ((metadata >> 32) as u16, metadata & 0xFFFF_FFFF)
}

impl OltPipeliner {
    /// Classifies and translates a forwarding objective.
    ///
    /// Multicast destinations resolve through the group installed by a
    /// prior next objective; unicast objectives are classified by the
    /// VLAN operation their treatment carries.
    pub fn forward(&self, fwd: ForwardingObjective) {
        if self.is_multicast(&fwd) {
            return self.forward_multicast(fwd);
        }

        let has_push = fwd.treatment.all_instructions().any(|i| i.is_vlan_push());
        let has_pop = fwd.treatment.all_instructions().any(|i| i.is_vlan_pop());
        let has_set = fwd.treatment.all_instructions().any(|i| i.is_vlan_set());

        if has_push {
            self.forward_upstream(fwd);
        } else if has_pop {
            self.forward_downstream(fwd);
        } else if has_set {
            error!("vlan rewrite without push or pop is not expressible: {}", fwd);
            let context = fwd.context.clone();
            fail(&context, ObjectiveError::Unsupported);
        } else {
            self.forward_passthrough(fwd);
        }
    }

    fn is_multicast(&self, fwd: &ForwardingObjective) -> bool {
        fwd.selector
            .ipv4_dst()
            .map(|ip| ip.is_multicast())
            .unwrap_or(false)
    }

    /// Multicast: one table-0 rule pointing the selector at the group.
    fn forward_multicast(&self, fwd: ForwardingObjective) {
        let context = fwd.context.clone();

        let next_id = match fwd.next_id {
            Some(id) => id,
            None => {
                error!("multicast objective has no next id: {}", fwd);
                return fail(&context, ObjectiveError::BadParams);
            }
        };

        let key = match self.group_key_for_next(next_id) {
            Some(key) => key,
            None => {
                error!("group for forwarding objective missing: {}", fwd);
                return fail(&context, ObjectiveError::GroupMissing);
            }
        };

        let group = match self.groups.get_group(&self.config.device, &key) {
            Some(group) => group,
            None => {
                error!("group {} is not installed on {}: {}", key, self.config.device, fwd);
                return fail(&context, ObjectiveError::GroupMissing);
            }
        };

        let treatment = TrafficTreatment::builder()
            .add(Instruction::Group(group.id))
            .build();
        let rule = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(0)
            .with_priority(fwd.priority)
            .with_selector(fwd.selector.clone())
            .with_treatment(treatment);

        self.dispatcher.submit(fwd.op, vec![rule], context);
    }

    /// Unicast with no VLAN modification: a single two-tag match rule.
    fn forward_passthrough(&self, fwd: ForwardingObjective) {
        let context = fwd.context.clone();

        let output = match fwd.treatment.output() {
            Some(port) => port,
            None => {
                error!("passthrough rule has no output: {}", fwd);
                return fail(&context, ObjectiveError::BadParams);
            }
        };

        let (in_port, outer_vlan, inner_vlan) = match (
            fwd.selector.in_port(),
            fwd.selector.vlan_id(),
            fwd.selector.inner_vlan_id(),
        ) {
            (Some(p), Some(o), Some(i)) => (p, o, i),
            _ => {
                error!("forwarding objective is underspecified: {}", fwd);
                return fail(&context, ObjectiveError::BadParams);
            }
        };

        let selector = TrafficSelector::builder()
            .match_in_port(in_port)
            .match_vlan_id(outer_vlan)
            .match_metadata(inner_vlan.raw() as u64)
            .build();
        let treatment = TrafficTreatment::builder()
            .add(Instruction::Output(output))
            .build();

        let rule = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(0)
            .with_priority(fwd.priority)
            .with_selector(selector)
            .with_treatment(treatment);

        self.dispatcher.submit(fwd.op, vec![rule], context);
    }

    /// Upstream (client to network): stage one sets the client tag,
    /// stage two pushes the service tag and outputs.
    fn forward_upstream(&self, fwd: ForwardingObjective) {
        let context = fwd.context.clone();

        let mut pairs = match self.vlan_op_pairs(&fwd, false) {
            Ok(pairs) => pairs,
            Err(e) => return fail(&context, e),
        };
        if pairs.len() < 2 {
            error!("upstream forwarding needs inner and outer vlan operations: {}", fwd);
            return fail(&context, ObjectiveError::BadParams);
        }

        let output = match fwd.treatment.output() {
            Some(port) => port,
            None => {
                error!("upstream rule has no output: {}", fwd);
                return fail(&context, ObjectiveError::BadParams);
            }
        };

        let inner_pair = pairs.remove(0);
        let outer_pair = pairs.remove(0);

        let matches_none = fwd.selector.vlan_id() == Some(VlanId::NONE);
        let matches_any = fwd.selector.vlan_id().map(|v| v.is_any()).unwrap_or(false);

        if matches_any {
            self.upstream_any_vlan(fwd, output, outer_pair);
        } else {
            self.upstream_vlans(fwd, output, inner_pair, outer_pair, matches_none);
        }
    }

    fn upstream_vlans(
        &self,
        fwd: ForwardingObjective,
        output: PortNumber,
        inner_pair: VlanOpPair,
        outer_pair: VlanOpPair,
        matches_none: bool,
    ) {
        let context = fwd.context.clone();
        let qinq_table = self.config.qinq_table;

        let in_port = match fwd.selector.in_port() {
            Some(port) => port,
            None => {
                error!("forwarding objective is underspecified: {}", fwd);
                return fail(&context, ObjectiveError::BadParams);
            }
        };

        // Untagged traffic needs the push; tagged traffic already carries
        // a header the hardware rewrites in place.
        let first_treatment = if matches_none {
            TrafficTreatment::builder()
                .add(inner_pair.0)
                .add(Instruction::SetVlanId(inner_pair.1))
                .add(Instruction::Transition(qinq_table))
                .build()
        } else {
            TrafficTreatment::builder()
                .add(Instruction::SetVlanId(inner_pair.1))
                .add(Instruction::Transition(qinq_table))
                .build()
        };

        let first = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(0)
            .with_priority(fwd.priority)
            .with_selector(fwd.selector.clone())
            .with_treatment(first_treatment);

        let second_selector = TrafficSelector::builder()
            .match_in_port(in_port)
            .match_vlan_id(inner_pair.1)
            .build();
        let second_treatment = TrafficTreatment::builder()
            .add(outer_pair.0)
            .add(Instruction::SetVlanId(outer_pair.1))
            .add_opt(fwd.treatment.meter().map(Instruction::Meter))
            .add_opt(fwd.treatment.table_transition().map(Instruction::Transition))
            .deferred()
            .add(Instruction::Output(output))
            .build();

        let second = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(qinq_table)
            .with_priority(fwd.priority)
            .with_selector(second_selector)
            .with_treatment(second_treatment);

        self.dispatcher.submit(fwd.op, vec![first, second], context);
    }

    fn upstream_any_vlan(
        &self,
        fwd: ForwardingObjective,
        output: PortNumber,
        outer_pair: VlanOpPair,
    ) {
        let context = fwd.context.clone();
        let qinq_table = self.config.qinq_table;

        debug!("installing upstream rules for any-vlan match");

        let in_port = match fwd.selector.in_port() {
            Some(port) => port,
            None => {
                error!("forwarding objective is underspecified: {}", fwd);
                return fail(&context, ObjectiveError::BadParams);
            }
        };

        let first = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(0)
            .with_priority(fwd.priority)
            .with_selector(fwd.selector.clone())
            .with_treatment(
                TrafficTreatment::builder()
                    .add(Instruction::Transition(qinq_table))
                    .build(),
            );

        // Untagged traffic on the port matches nothing above, so it is
        // dropped here instead of leaking through.
        let default_drop = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(0)
            .with_priority(self.config.no_action_priority)
            .with_selector(TrafficSelector::builder().match_in_port(in_port).build())
            .with_treatment(TrafficTreatment::empty());

        let second_treatment = TrafficTreatment::builder()
            .add(Instruction::PushVlan(EtherType::QINQ))
            .add(Instruction::SetVlanId(outer_pair.1))
            .add_opt(fwd.treatment.meter().map(Instruction::Meter))
            .add_opt(fwd.treatment.table_transition().map(Instruction::Transition))
            .deferred()
            .add(Instruction::Output(output))
            .build();

        let second = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(qinq_table)
            .with_priority(fwd.priority)
            .with_selector(fwd.selector.clone())
            .with_treatment(second_treatment);

        self.dispatcher
            .submit(fwd.op, vec![first, default_drop, second], context);
    }

    /// Downstream (network to client): stage one pops the service tag,
    /// stage two rewrites or strips the client tag and outputs.
    fn forward_downstream(&self, fwd: ForwardingObjective) {
        let context = fwd.context.clone();

        let output = match fwd.treatment.output() {
            Some(port) => port,
            None => {
                error!("downstream rule has no output: {}", fwd);
                return fail(&context, ObjectiveError::BadParams);
            }
        };

        let (in_port, outer_vlan, inner_vlan) = match (
            fwd.selector.in_port(),
            fwd.selector.vlan_id(),
            fwd.selector.inner_vlan_id(),
        ) {
            (Some(p), Some(o), Some(i)) => (p, o, i),
            _ => {
                error!("forwarding objective is underspecified: {}", fwd);
                return fail(&context, ObjectiveError::BadParams);
            }
        };

        let metadata = pack_metadata(inner_vlan, output);
        let outer_selector = TrafficSelector::builder()
            .match_in_port(in_port)
            .match_vlan_id(outer_vlan)
            .match_metadata(metadata)
            .build();

        if inner_vlan.is_any() {
            let inner_selector = TrafficSelector::builder()
                .match_in_port(in_port)
                .match_vlan_id(VlanId::ANY)
                .build();
            self.downstream_any_vlan(fwd, output, outer_selector, inner_selector);
        } else {
            let inner_selector = TrafficSelector::builder()
                .match_in_port(in_port)
                .match_vlan_id(inner_vlan)
                .build();
            self.downstream_vlans(fwd, output, outer_selector, inner_selector);
        }
    }

    fn downstream_vlans(
        &self,
        fwd: ForwardingObjective,
        output: PortNumber,
        outer_selector: TrafficSelector,
        inner_selector: TrafficSelector,
    ) {
        let context = fwd.context.clone();
        let qinq_table = self.config.qinq_table;

        let mut pairs = match self.vlan_op_pairs(&fwd, true) {
            Ok(pairs) => pairs,
            Err(e) => return fail(&context, e),
        };
        let pop_rewrite = pairs.remove(0);

        // A rewrite target of NONE strips the inner tag entirely.
        let mut builder = TrafficTreatment::builder().add(pop_rewrite.0);
        if !pop_rewrite.1.is_none() {
            builder = builder.add(Instruction::SetVlanId(pop_rewrite.1));
        }
        let inner_treatment = builder
            .add_opt(fwd.treatment.meter().map(Instruction::Meter))
            .add_opt(fwd.treatment.table_transition().map(Instruction::Transition))
            .deferred()
            .add(Instruction::Output(output))
            .build();

        let inner = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(qinq_table)
            .with_priority(fwd.priority)
            .with_selector(inner_selector)
            .with_treatment(inner_treatment);

        let outer = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(0)
            .with_priority(fwd.priority)
            .with_selector(outer_selector)
            .with_treatment(
                TrafficTreatment::builder()
                    .add(pop_rewrite.0)
                    .add(Instruction::Transition(qinq_table))
                    .build(),
            );

        self.dispatcher.submit(fwd.op, vec![inner, outer], context);
    }

    fn downstream_any_vlan(
        &self,
        fwd: ForwardingObjective,
        output: PortNumber,
        outer_selector: TrafficSelector,
        inner_selector: TrafficSelector,
    ) {
        let context = fwd.context.clone();
        let qinq_table = self.config.qinq_table;

        let outer = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(0)
            .with_priority(fwd.priority)
            .with_selector(outer_selector)
            .with_treatment(
                TrafficTreatment::builder()
                    .add(Instruction::Transition(qinq_table))
                    .deferred()
                    .add(Instruction::PopVlan)
                    .build(),
            );

        let inner_treatment = TrafficTreatment::builder()
            .add_opt(fwd.treatment.meter().map(Instruction::Meter))
            .add_opt(fwd.treatment.table_transition().map(Instruction::Transition))
            .deferred()
            .add(Instruction::Output(output))
            .build();

        let inner = FlowRule::new(self.config.device.clone(), fwd.app_id)
            .for_table(qinq_table)
            .with_priority(fwd.priority)
            .with_selector(inner_selector)
            .with_treatment(inner_treatment);

        self.dispatcher.submit(fwd.op, vec![inner, outer], context);
    }

    /// Extracts the positionally paired (push-or-pop, set-VLAN) operations
    /// from the objective's treatment.
    ///
    /// The Nth push (or pop) pairs with the Nth set; a count mismatch or
    /// an empty result is a malformed treatment.
    fn vlan_op_pairs(
        &self,
        fwd: &ForwardingObjective,
        pop: bool,
    ) -> Result<Vec<VlanOpPair>, ObjectiveError> {
        let tags: Vec<Instruction> = fwd
            .treatment
            .all_instructions()
            .filter(|i| if pop { i.is_vlan_pop() } else { i.is_vlan_push() })
            .copied()
            .collect();
        let sets: Vec<VlanId> = fwd
            .treatment
            .all_instructions()
            .filter_map(|i| match i {
                Instruction::SetVlanId(vlan) => Some(*vlan),
                _ => None,
            })
            .collect();

        if tags.is_empty() || tags.len() != sets.len() {
            let direction = if pop { "downstream" } else { "upstream" };
            error!("missing vlan operations in {} forwarding: {}", direction, fwd);
            return Err(ObjectiveError::BadParams);
        }

        Ok(tags.into_iter().zip(sets).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{pipeliner, RecordingContext};
    use olt_flow::{GroupKey, NextGroupRecord, ObjectiveOp, ObjectiveStore};
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    const NNI: PortNumber = PortNumber::new(65536);

    fn vlan(id: u16) -> VlanId {
        VlanId::new(id).unwrap()
    }

    fn upstream_objective(
        selector_vlan: VlanId,
        context: Arc<RecordingContext>,
    ) -> ForwardingObjective {
        let selector = TrafficSelector::builder()
            .match_in_port(PortNumber::new(1))
            .match_vlan_id(selector_vlan)
            .build();
        let treatment = TrafficTreatment::builder()
            .add(Instruction::PushVlan(EtherType::VLAN))
            .add(Instruction::SetVlanId(vlan(100)))
            .add(Instruction::PushVlan(EtherType::QINQ))
            .add(Instruction::SetVlanId(vlan(200)))
            .add(Instruction::Output(NNI))
            .add(Instruction::Transition(64))
            .build();
        ForwardingObjective::new(ObjectiveOp::Add)
            .with_selector(selector)
            .with_treatment(treatment)
            .with_priority(1000)
            .from_app(2)
            .with_context(context)
    }

    #[test]
    fn test_metadata_round_trip() {
        for (inner, port) in [
            (0u16, 0u64),
            (100, 65536),
            (4095, 0xFFFF_FFFF),
            (1, 0xABCD_1234),
        ] {
            let metadata = pack_metadata(vlan(inner), PortNumber::new(port));
            assert_eq!(unpack_metadata(metadata), (inner, port));
        }
    }

    #[test]
    fn test_metadata_round_trips_sentinels() {
        let metadata = pack_metadata(VlanId::ANY, PortNumber::new(7));
        assert_eq!(unpack_metadata(metadata), (VlanId::ANY.raw(), 7));
    }

    #[tokio::test]
    async fn test_upstream_untagged_scenario() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        pipeliner.forward(upstream_objective(VlanId::NONE, context.clone()));

        assert_eq!(context.settled().await, Ok(()));
        let batch = flow_rules.batches().remove(0);
        assert_eq!(batch.len(), 2);
        assert!(batch.ops().iter().all(|op| op.is_add()));

        // Stage one: match untagged at the UNI, push and set the c-tag,
        // continue in the QinQ table.
        let first = batch.ops()[0].rule().clone();
        assert_eq!(first.table, 0);
        assert_eq!(
            first.selector,
            TrafficSelector::builder()
                .match_in_port(PortNumber::new(1))
                .match_vlan_id(VlanId::NONE)
                .build()
        );
        assert_eq!(
            first.treatment,
            TrafficTreatment::builder()
                .add(Instruction::PushVlan(EtherType::VLAN))
                .add(Instruction::SetVlanId(vlan(100)))
                .add(Instruction::Transition(1))
                .build()
        );

        // Stage two: match the c-tag, push and set the s-tag, output
        // deferred, continue in the technology profile table.
        let second = batch.ops()[1].rule().clone();
        assert_eq!(second.table, 1);
        assert_eq!(
            second.selector,
            TrafficSelector::builder()
                .match_in_port(PortNumber::new(1))
                .match_vlan_id(vlan(100))
                .build()
        );
        assert_eq!(
            second.treatment,
            TrafficTreatment::builder()
                .add(Instruction::PushVlan(EtherType::QINQ))
                .add(Instruction::SetVlanId(vlan(200)))
                .add(Instruction::Transition(64))
                .deferred()
                .add(Instruction::Output(NNI))
                .build()
        );
    }

    #[tokio::test]
    async fn test_upstream_tagged_omits_push() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        pipeliner.forward(upstream_objective(vlan(0), context.clone()));

        assert_eq!(context.settled().await, Ok(()));
        let first = flow_rules.batches()[0].ops()[0].rule().clone();
        assert_eq!(
            first.treatment,
            TrafficTreatment::builder()
                .add(Instruction::SetVlanId(vlan(100)))
                .add(Instruction::Transition(1))
                .build()
        );
    }

    #[tokio::test]
    async fn test_upstream_any_vlan_installs_default_drop() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        pipeliner.forward(upstream_objective(VlanId::ANY, context.clone()));

        assert_eq!(context.settled().await, Ok(()));
        let batch = flow_rules.batches().remove(0);
        assert_eq!(batch.len(), 3);

        let first = batch.ops()[0].rule().clone();
        assert_eq!(first.table, 0);
        assert_eq!(
            first.treatment,
            TrafficTreatment::builder()
                .add(Instruction::Transition(1))
                .build()
        );

        let drop = batch.ops()[1].rule().clone();
        assert_eq!(drop.priority, 500);
        assert_eq!(
            drop.selector,
            TrafficSelector::builder()
                .match_in_port(PortNumber::new(1))
                .build()
        );
        assert!(drop.treatment.is_empty());

        let second = batch.ops()[2].rule().clone();
        assert_eq!(second.table, 1);
        assert_eq!(
            second.treatment,
            TrafficTreatment::builder()
                .add(Instruction::PushVlan(EtherType::QINQ))
                .add(Instruction::SetVlanId(vlan(200)))
                .add(Instruction::Transition(64))
                .deferred()
                .add(Instruction::Output(NNI))
                .build()
        );
    }

    #[tokio::test]
    async fn test_vlan_op_count_mismatch_rejected() {
        // Zero, one, and N>2 mismatched combinations all fail without
        // dispatching anything.
        let cases: Vec<Vec<Instruction>> = vec![
            // One push, zero sets.
            vec![Instruction::PushVlan(EtherType::VLAN)],
            // One push, two sets.
            vec![
                Instruction::PushVlan(EtherType::VLAN),
                Instruction::SetVlanId(vlan(10)),
                Instruction::SetVlanId(vlan(20)),
            ],
            // Three pushes, two sets.
            vec![
                Instruction::PushVlan(EtherType::VLAN),
                Instruction::PushVlan(EtherType::VLAN),
                Instruction::PushVlan(EtherType::QINQ),
                Instruction::SetVlanId(vlan(10)),
                Instruction::SetVlanId(vlan(20)),
            ],
        ];

        for instructions in cases {
            let (pipeliner, flow_rules, _, _) = pipeliner();
            let context = RecordingContext::new();

            let mut builder = TrafficTreatment::builder().add(Instruction::Output(NNI));
            for i in instructions {
                builder = builder.add(i);
            }
            let fwd = ForwardingObjective::new(ObjectiveOp::Add)
                .with_selector(
                    TrafficSelector::builder()
                        .match_in_port(PortNumber::new(1))
                        .match_vlan_id(VlanId::NONE)
                        .build(),
                )
                .with_treatment(builder.build())
                .with_context(context.clone());
            pipeliner.forward(fwd);

            assert_eq!(context.outcomes(), vec![Err(ObjectiveError::BadParams)]);
            assert!(flow_rules.batches().is_empty());
        }
    }

    #[tokio::test]
    async fn test_upstream_single_pair_rejected() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        let treatment = TrafficTreatment::builder()
            .add(Instruction::PushVlan(EtherType::VLAN))
            .add(Instruction::SetVlanId(vlan(100)))
            .add(Instruction::Output(NNI))
            .build();
        let fwd = ForwardingObjective::new(ObjectiveOp::Add)
            .with_selector(
                TrafficSelector::builder()
                    .match_in_port(PortNumber::new(1))
                    .match_vlan_id(VlanId::NONE)
                    .build(),
            )
            .with_treatment(treatment)
            .with_context(context.clone());
        pipeliner.forward(fwd);

        assert_eq!(context.outcomes(), vec![Err(ObjectiveError::BadParams)]);
        assert!(flow_rules.batches().is_empty());
    }

    fn downstream_objective(
        inner_vlan: VlanId,
        rewrite_to: VlanId,
        context: Arc<RecordingContext>,
    ) -> ForwardingObjective {
        let selector = TrafficSelector::builder()
            .match_in_port(NNI)
            .match_vlan_id(vlan(200))
            .match_inner_vlan_id(inner_vlan)
            .build();
        let treatment = TrafficTreatment::builder()
            .add(Instruction::PopVlan)
            .add(Instruction::SetVlanId(rewrite_to))
            .add(Instruction::Output(PortNumber::new(1)))
            .add(Instruction::Transition(64))
            .build();
        ForwardingObjective::new(ObjectiveOp::Add)
            .with_selector(selector)
            .with_treatment(treatment)
            .with_priority(1000)
            .from_app(2)
            .with_context(context)
    }

    #[tokio::test]
    async fn test_downstream_rewrite_scenario() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        pipeliner.forward(downstream_objective(vlan(100), vlan(100), context.clone()));

        assert_eq!(context.settled().await, Ok(()));
        let batch = flow_rules.batches().remove(0);
        assert_eq!(batch.len(), 2);

        // Stage two first (as dispatched): pop, re-tag, output deferred.
        let inner = batch.ops()[0].rule().clone();
        assert_eq!(inner.table, 1);
        assert_eq!(
            inner.selector,
            TrafficSelector::builder()
                .match_in_port(NNI)
                .match_vlan_id(vlan(100))
                .build()
        );
        assert_eq!(
            inner.treatment,
            TrafficTreatment::builder()
                .add(Instruction::PopVlan)
                .add(Instruction::SetVlanId(vlan(100)))
                .add(Instruction::Transition(64))
                .deferred()
                .add(Instruction::Output(PortNumber::new(1)))
                .build()
        );

        // Stage one: match s-tag plus packed metadata, pop, transition.
        let outer = batch.ops()[1].rule().clone();
        assert_eq!(outer.table, 0);
        let expected_metadata = pack_metadata(vlan(100), PortNumber::new(1));
        assert_eq!(
            outer.selector,
            TrafficSelector::builder()
                .match_in_port(NNI)
                .match_vlan_id(vlan(200))
                .match_metadata(expected_metadata)
                .build()
        );
        assert_eq!(
            outer.treatment,
            TrafficTreatment::builder()
                .add(Instruction::PopVlan)
                .add(Instruction::Transition(1))
                .build()
        );
    }

    #[tokio::test]
    async fn test_downstream_strip_omits_rewrite() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        pipeliner.forward(downstream_objective(vlan(100), VlanId::NONE, context.clone()));

        assert_eq!(context.settled().await, Ok(()));
        let inner = flow_rules.batches()[0].ops()[0].rule().clone();
        assert_eq!(
            inner.treatment,
            TrafficTreatment::builder()
                .add(Instruction::PopVlan)
                .add(Instruction::Transition(64))
                .deferred()
                .add(Instruction::Output(PortNumber::new(1)))
                .build()
        );
    }

    #[tokio::test]
    async fn test_downstream_any_vlan() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        pipeliner.forward(downstream_objective(VlanId::ANY, vlan(100), context.clone()));

        assert_eq!(context.settled().await, Ok(()));
        let batch = flow_rules.batches().remove(0);

        let inner = batch.ops()[0].rule().clone();
        assert_eq!(inner.table, 1);
        assert_eq!(
            inner.selector,
            TrafficSelector::builder()
                .match_in_port(NNI)
                .match_vlan_id(VlanId::ANY)
                .build()
        );
        assert_eq!(
            inner.treatment,
            TrafficTreatment::builder()
                .add(Instruction::Transition(64))
                .deferred()
                .add(Instruction::Output(PortNumber::new(1)))
                .build()
        );

        let outer = batch.ops()[1].rule().clone();
        assert_eq!(
            outer.treatment,
            TrafficTreatment::builder()
                .add(Instruction::Transition(1))
                .deferred()
                .add(Instruction::PopVlan)
                .build()
        );
    }

    #[tokio::test]
    async fn test_downstream_missing_criteria_rejected() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        // No inner vlan criterion.
        let selector = TrafficSelector::builder()
            .match_in_port(NNI)
            .match_vlan_id(vlan(200))
            .build();
        let treatment = TrafficTreatment::builder()
            .add(Instruction::PopVlan)
            .add(Instruction::SetVlanId(vlan(100)))
            .add(Instruction::Output(PortNumber::new(1)))
            .build();
        let fwd = ForwardingObjective::new(ObjectiveOp::Add)
            .with_selector(selector)
            .with_treatment(treatment)
            .with_context(context.clone());
        pipeliner.forward(fwd);

        assert_eq!(context.outcomes(), vec![Err(ObjectiveError::BadParams)]);
        assert!(flow_rules.batches().is_empty());
    }

    #[tokio::test]
    async fn test_passthrough_rule_shape() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        let selector = TrafficSelector::builder()
            .match_in_port(PortNumber::new(1))
            .match_vlan_id(vlan(200))
            .match_inner_vlan_id(vlan(100))
            .build();
        let treatment = TrafficTreatment::builder()
            .add(Instruction::Output(NNI))
            .build();
        let fwd = ForwardingObjective::new(ObjectiveOp::Add)
            .with_selector(selector)
            .with_treatment(treatment)
            .with_priority(900)
            .with_context(context.clone());
        pipeliner.forward(fwd);

        assert_eq!(context.settled().await, Ok(()));
        let batch = flow_rules.batches().remove(0);
        assert_eq!(batch.len(), 1);
        let rule = batch.ops()[0].rule().clone();
        assert_eq!(rule.table, 0);
        assert_eq!(
            rule.selector,
            TrafficSelector::builder()
                .match_in_port(PortNumber::new(1))
                .match_vlan_id(vlan(200))
                .match_metadata(100)
                .build()
        );
    }

    #[tokio::test]
    async fn test_passthrough_missing_fields_rejected() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        let selector = TrafficSelector::builder()
            .match_in_port(PortNumber::new(1))
            .build();
        let fwd = ForwardingObjective::new(ObjectiveOp::Add)
            .with_selector(selector)
            .with_treatment(
                TrafficTreatment::builder()
                    .add(Instruction::Output(NNI))
                    .build(),
            )
            .with_context(context.clone());
        pipeliner.forward(fwd);

        assert_eq!(context.outcomes(), vec![Err(ObjectiveError::BadParams)]);
        assert!(flow_rules.batches().is_empty());
    }

    #[tokio::test]
    async fn test_vlan_set_alone_unsupported() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        let fwd = ForwardingObjective::new(ObjectiveOp::Add)
            .with_treatment(
                TrafficTreatment::builder()
                    .add(Instruction::SetVlanId(vlan(100)))
                    .add(Instruction::Output(NNI))
                    .build(),
            )
            .with_context(context.clone());
        pipeliner.forward(fwd);

        assert_eq!(context.outcomes(), vec![Err(ObjectiveError::Unsupported)]);
        assert!(flow_rules.batches().is_empty());
    }

    fn multicast_objective(context: Arc<RecordingContext>) -> ForwardingObjective {
        let selector = TrafficSelector::builder()
            .match_vlan_id(vlan(4000))
            .match_ipv4_dst(Ipv4Addr::new(224, 0, 0, 22))
            .build();
        ForwardingObjective::new(ObjectiveOp::Add)
            .with_selector(selector)
            .with_priority(500)
            .with_next_id(42)
            .with_context(context)
    }

    #[tokio::test]
    async fn test_multicast_unresolved_next_fails() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        pipeliner.forward(multicast_objective(context.clone()));

        assert_eq!(context.outcomes(), vec![Err(ObjectiveError::GroupMissing)]);
        assert!(flow_rules.batches().is_empty());
    }

    #[tokio::test]
    async fn test_multicast_missing_next_id_fails() {
        let (pipeliner, flow_rules, _, _) = pipeliner();
        let context = RecordingContext::new();

        let mut fwd = multicast_objective(context.clone());
        fwd.next_id = None;
        pipeliner.forward(fwd);

        assert_eq!(context.outcomes(), vec![Err(ObjectiveError::BadParams)]);
        assert!(flow_rules.batches().is_empty());
    }

    #[tokio::test]
    async fn test_multicast_resolved_group_rule() {
        let (pipeliner, flow_rules, groups, store) = pipeliner();
        let context = RecordingContext::new();

        let key = GroupKey::from_next_id(42);
        store.put_next_group(42, NextGroupRecord::new(key.clone()).encode());
        groups.install(key, 0x7000_0001);

        pipeliner.forward(multicast_objective(context.clone()));

        assert_eq!(context.settled().await, Ok(()));
        let batch = flow_rules.batches().remove(0);
        assert_eq!(batch.len(), 1);
        let rule = batch.ops()[0].rule().clone();
        assert_eq!(rule.table, 0);
        assert_eq!(
            rule.treatment,
            TrafficTreatment::builder()
                .add(Instruction::Group(0x7000_0001))
                .build()
        );
        assert_eq!(rule.selector, multicast_objective(RecordingContext::new()).selector);
    }

    #[tokio::test]
    async fn test_multicast_membership_ops_dispatch_empty_batch() {
        let (pipeliner, flow_rules, groups, store) = pipeliner();
        let context = RecordingContext::new();

        let key = GroupKey::from_next_id(42);
        store.put_next_group(42, NextGroupRecord::new(key.clone()).encode());
        groups.install(key, 1);

        let mut fwd = multicast_objective(context.clone());
        fwd.op = ObjectiveOp::AddToExisting;
        pipeliner.forward(fwd);

        assert_eq!(context.settled().await, Ok(()));
        assert!(flow_rules.batches()[0].is_empty());
    }
}

//! Filtering objective translation: control-plane punt rules.

use crate::pipeliner::{fail, OltPipeliner};
use log::warn;
use olt_flow::{
    Criterion, CriterionKind, FilterType, FilteringObjective, FlowRule, Instruction,
    ObjectiveError, ObjectiveOp, TrafficSelector, TrafficTreatment,
};
use olt_types::{EtherType, IpProtocol, PortNumber};

/// DHCP client source port.
const DHCP_CLIENT_PORT: u16 = 68;

/// DHCP server destination port.
const DHCP_SERVER_PORT: u16 = 67;

impl OltPipeliner {
    /// Translates a filtering objective into one table-0 punt rule.
    ///
    /// Only EAPOL, LLDP, IGMP, and DHCP filters are expressible on this
    /// pipeline, and the only supported treatment is an output to the
    /// controller. Everything else fails synchronously.
    pub fn filter(&self, filter: FilteringObjective) {
        let context = filter.context.clone();

        let output = match &filter.meta {
            Some(meta) if !meta.immediate().is_empty() => {
                match meta.immediate().iter().find_map(|i| match i {
                    Instruction::Output(port) => Some(*port),
                    _ => None,
                }) {
                    Some(port) if port == PortNumber::CONTROLLER => port,
                    Some(_) => {
                        warn!("can only filter packets to the controller: {}", filter);
                        return fail(&context, ObjectiveError::Unsupported);
                    }
                    None => return fail(&context, ObjectiveError::BadParams),
                }
            }
            _ => return fail(&context, ObjectiveError::BadParams),
        };

        let in_port = match filter.key {
            Criterion::InPort(port) => port,
            _ => return fail(&context, ObjectiveError::BadParams),
        };

        let eth_type = match filter.condition(CriterionKind::EthType) {
            Some(Criterion::EthType(etype)) => *etype,
            _ => return fail(&context, ObjectiveError::BadParams),
        };

        match eth_type {
            EtherType::EAPOL | EtherType::LLDP => {
                let selector = TrafficSelector::builder()
                    .match_in_port(in_port)
                    .match_eth_type(eth_type)
                    .build();
                self.apply_filter_rule(&filter, selector, output);
            }
            EtherType::IPV4 => self.filter_ipv4(filter, in_port, output),
            _ => {
                warn!(
                    "filterable ether types are EAPOL, LLDP and IPv4 (IGMP or DHCP): {}",
                    filter
                );
                fail(&context, ObjectiveError::Unsupported);
            }
        }
    }

    fn filter_ipv4(&self, filter: FilteringObjective, in_port: PortNumber, output: PortNumber) {
        let context = filter.context.clone();

        let ip_proto = match filter.condition(CriterionKind::IpProto) {
            Some(Criterion::IpProto(proto)) => *proto,
            _ => {
                warn!("can only filter IGMP and DHCP: {}", filter);
                return fail(&context, ObjectiveError::Unsupported);
            }
        };

        match ip_proto {
            IpProtocol::IGMP => {
                let selector = TrafficSelector::builder()
                    .match_in_port(in_port)
                    .match_eth_type(EtherType::IPV4)
                    .match_ip_proto(ip_proto)
                    .build();
                self.apply_filter_rule(&filter, selector, output);
            }
            IpProtocol::UDP => {
                let udp_src = match filter.condition(CriterionKind::UdpSrc) {
                    Some(Criterion::UdpSrc(port)) => *port,
                    _ => return fail(&context, ObjectiveError::BadParams),
                };
                let udp_dst = match filter.condition(CriterionKind::UdpDst) {
                    Some(Criterion::UdpDst(port)) => *port,
                    _ => return fail(&context, ObjectiveError::BadParams),
                };
                if udp_src != DHCP_CLIENT_PORT || udp_dst != DHCP_SERVER_PORT {
                    warn!("can only filter DHCP, wrong UDP ports: {}", filter);
                    return fail(&context, ObjectiveError::Unsupported);
                }

                let selector = TrafficSelector::builder()
                    .match_in_port(in_port)
                    .match_eth_type(EtherType::IPV4)
                    .match_ip_proto(ip_proto)
                    .match_udp_src(udp_src)
                    .match_udp_dst(udp_dst)
                    .build();
                self.apply_filter_rule(&filter, selector, output);
            }
            _ => {
                warn!("can only filter IGMP and DHCP: {}", filter);
                fail(&context, ObjectiveError::Unsupported);
            }
        }
    }

    fn apply_filter_rule(
        &self,
        filter: &FilteringObjective,
        selector: TrafficSelector,
        output: PortNumber,
    ) {
        let treatment = TrafficTreatment::builder()
            .add(Instruction::Output(output))
            .build();

        let rule = FlowRule::new(self.config.device.clone(), filter.app_id)
            .for_table(0)
            .with_priority(filter.priority)
            .with_selector(selector)
            .with_treatment(treatment);

        let op = match filter.filter_type {
            FilterType::Permit => ObjectiveOp::Add,
            FilterType::Deny => ObjectiveOp::Remove,
        };

        self.dispatcher.submit(op, vec![rule], filter.context.clone());
    }
}

//! Match criteria and traffic selectors.

use olt_types::{EtherType, IpProtocol, PortNumber, VlanId};
use std::fmt;
use std::net::Ipv4Addr;

/// A single match condition on a packet field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Ingress port.
    InPort(PortNumber),
    /// Ethernet frame type.
    EthType(EtherType),
    /// IPv4 protocol number.
    IpProto(IpProtocol),
    /// UDP source port.
    UdpSrc(u16),
    /// UDP destination port.
    UdpDst(u16),
    /// Outermost VLAN ID (concrete, untagged, or wildcard).
    VlanId(VlanId),
    /// Inner (client) VLAN ID of a double-tagged frame.
    InnerVlanId(VlanId),
    /// IPv4 destination address.
    Ipv4Dst(Ipv4Addr),
    /// Opaque 64-bit metadata carried between pipeline tables.
    Metadata(u64),
}

/// Discriminant of a [`Criterion`], used for keyed lookup in a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriterionKind {
    InPort,
    EthType,
    IpProto,
    UdpSrc,
    UdpDst,
    VlanId,
    InnerVlanId,
    Ipv4Dst,
    Metadata,
}

impl Criterion {
    /// Returns the discriminant of this criterion.
    pub const fn kind(&self) -> CriterionKind {
        match self {
            Criterion::InPort(_) => CriterionKind::InPort,
            Criterion::EthType(_) => CriterionKind::EthType,
            Criterion::IpProto(_) => CriterionKind::IpProto,
            Criterion::UdpSrc(_) => CriterionKind::UdpSrc,
            Criterion::UdpDst(_) => CriterionKind::UdpDst,
            Criterion::VlanId(_) => CriterionKind::VlanId,
            Criterion::InnerVlanId(_) => CriterionKind::InnerVlanId,
            Criterion::Ipv4Dst(_) => CriterionKind::Ipv4Dst,
            Criterion::Metadata(_) => CriterionKind::Metadata,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::InPort(p) => write!(f, "IN_PORT:{}", p),
            Criterion::EthType(t) => write!(f, "ETH_TYPE:{}", t),
            Criterion::IpProto(p) => write!(f, "IP_PROTO:{}", p),
            Criterion::UdpSrc(p) => write!(f, "UDP_SRC:{}", p),
            Criterion::UdpDst(p) => write!(f, "UDP_DST:{}", p),
            Criterion::VlanId(v) => write!(f, "VLAN_VID:{}", v),
            Criterion::InnerVlanId(v) => write!(f, "INNER_VLAN_VID:{}", v),
            Criterion::Ipv4Dst(ip) => write!(f, "IPV4_DST:{}", ip),
            Criterion::Metadata(m) => write!(f, "METADATA:0x{:x}", m),
        }
    }
}

/// An ordered set of match criteria, at most one per [`CriterionKind`].
///
/// Selectors preserve insertion order (the order criteria are written to
/// hardware) while offering keyed lookup by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficSelector {
    criteria: Vec<Criterion>,
}

impl TrafficSelector {
    /// Returns a new selector builder.
    pub fn builder() -> TrafficSelectorBuilder {
        TrafficSelectorBuilder::default()
    }

    /// Returns the criteria in insertion order.
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Returns the criterion of the given kind, if present.
    pub fn criterion(&self, kind: CriterionKind) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.kind() == kind)
    }

    /// Returns the ingress-port match, if present.
    pub fn in_port(&self) -> Option<PortNumber> {
        match self.criterion(CriterionKind::InPort) {
            Some(Criterion::InPort(p)) => Some(*p),
            _ => None,
        }
    }

    /// Returns the outer VLAN match, if present.
    pub fn vlan_id(&self) -> Option<VlanId> {
        match self.criterion(CriterionKind::VlanId) {
            Some(Criterion::VlanId(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner VLAN match, if present.
    pub fn inner_vlan_id(&self) -> Option<VlanId> {
        match self.criterion(CriterionKind::InnerVlanId) {
            Some(Criterion::InnerVlanId(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the IPv4 destination match, if present.
    pub fn ipv4_dst(&self) -> Option<Ipv4Addr> {
        match self.criterion(CriterionKind::Ipv4Dst) {
            Some(Criterion::Ipv4Dst(ip)) => Some(*ip),
            _ => None,
        }
    }

    /// Returns true if the selector has no criteria.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl fmt::Display for TrafficSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.criteria.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "]")
    }
}

/// Builder for [`TrafficSelector`].
///
/// Adding a criterion of a kind already present replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct TrafficSelectorBuilder {
    criteria: Vec<Criterion>,
}

impl TrafficSelectorBuilder {
    /// Adds a criterion, replacing any existing criterion of the same kind.
    pub fn add(mut self, criterion: Criterion) -> Self {
        self.criteria.retain(|c| c.kind() != criterion.kind());
        self.criteria.push(criterion);
        self
    }

    /// Matches on the ingress port.
    pub fn match_in_port(self, port: PortNumber) -> Self {
        self.add(Criterion::InPort(port))
    }

    /// Matches on the Ethernet frame type.
    pub fn match_eth_type(self, etype: EtherType) -> Self {
        self.add(Criterion::EthType(etype))
    }

    /// Matches on the IPv4 protocol number.
    pub fn match_ip_proto(self, proto: IpProtocol) -> Self {
        self.add(Criterion::IpProto(proto))
    }

    /// Matches on the UDP source port.
    pub fn match_udp_src(self, port: u16) -> Self {
        self.add(Criterion::UdpSrc(port))
    }

    /// Matches on the UDP destination port.
    pub fn match_udp_dst(self, port: u16) -> Self {
        self.add(Criterion::UdpDst(port))
    }

    /// Matches on the outer VLAN ID.
    pub fn match_vlan_id(self, vlan: VlanId) -> Self {
        self.add(Criterion::VlanId(vlan))
    }

    /// Matches on the inner VLAN ID.
    pub fn match_inner_vlan_id(self, vlan: VlanId) -> Self {
        self.add(Criterion::InnerVlanId(vlan))
    }

    /// Matches on the IPv4 destination address.
    pub fn match_ipv4_dst(self, addr: Ipv4Addr) -> Self {
        self.add(Criterion::Ipv4Dst(addr))
    }

    /// Matches on the cross-table metadata field.
    pub fn match_metadata(self, metadata: u64) -> Self {
        self.add(Criterion::Metadata(metadata))
    }

    /// Builds the selector.
    pub fn build(self) -> TrafficSelector {
        TrafficSelector {
            criteria: self.criteria,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keyed_lookup() {
        let selector = TrafficSelector::builder()
            .match_in_port(PortNumber::new(1))
            .match_vlan_id(VlanId::new(100).unwrap())
            .build();

        assert_eq!(selector.in_port(), Some(PortNumber::new(1)));
        assert_eq!(selector.vlan_id(), Some(VlanId::new(100).unwrap()));
        assert_eq!(selector.inner_vlan_id(), None);
        assert!(selector.criterion(CriterionKind::EthType).is_none());
    }

    #[test]
    fn test_add_replaces_same_kind() {
        let selector = TrafficSelector::builder()
            .match_vlan_id(VlanId::new(100).unwrap())
            .match_vlan_id(VlanId::new(200).unwrap())
            .build();

        assert_eq!(selector.criteria().len(), 1);
        assert_eq!(selector.vlan_id(), Some(VlanId::new(200).unwrap()));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let selector = TrafficSelector::builder()
            .match_in_port(PortNumber::new(5))
            .match_eth_type(EtherType::IPV4)
            .match_ip_proto(IpProtocol::UDP)
            .build();

        let kinds: Vec<CriterionKind> = selector.criteria().iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                CriterionKind::InPort,
                CriterionKind::EthType,
                CriterionKind::IpProto
            ]
        );
    }

    #[test]
    fn test_display() {
        let selector = TrafficSelector::builder()
            .match_in_port(PortNumber::new(1))
            .match_vlan_id(VlanId::NONE)
            .build();
        assert_eq!(selector.to_string(), "[IN_PORT:1, VLAN_VID:none]");
    }
}

//! Typed network primitives for the OLT pipeline translator.
//!
//! This crate provides type-safe representations of the values the
//! translator matches on and rewrites:
//!
//! - [`VlanId`]: 802.1Q VLAN identifiers, including the untagged and
//!   wildcard sentinel encodings used by pipeline match fields
//! - [`PortNumber`]: device port numbers, including the logical
//!   controller port
//! - [`EtherType`]: Ethernet frame types (EAPOL, LLDP, IPv4, QinQ)
//! - [`IpProtocol`]: IP protocol numbers (IGMP, UDP)

mod ethertype;
mod port;
mod proto;
mod vlan;

pub use ethertype::EtherType;
pub use port::PortNumber;
pub use proto::IpProtocol;
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid VLAN ID: {0} (must be 0-4095, 'none' or 'any')")]
    InvalidVlanId(u16),

    #[error("invalid port number: {0}")]
    InvalidPortNumber(String),

    #[error("invalid ether type: {0}")]
    InvalidEtherType(String),
}

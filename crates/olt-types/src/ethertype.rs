//! Ethernet frame type values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An Ethernet frame type (the 16-bit EtherType field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EtherType(u16);

impl EtherType {
    /// IPv4 (0x0800).
    pub const IPV4: EtherType = EtherType(0x0800);

    /// 802.1Q VLAN tag (0x8100).
    pub const VLAN: EtherType = EtherType(0x8100);

    /// 802.1ad service tag, QinQ outer header (0x88A8).
    pub const QINQ: EtherType = EtherType(0x88A8);

    /// 802.1X EAPOL authentication frames (0x888E).
    pub const EAPOL: EtherType = EtherType(0x888E);

    /// Link Layer Discovery Protocol (0x88CC).
    pub const LLDP: EtherType = EtherType(0x88CC);

    /// Creates an ether type from its raw value.
    pub const fn new(value: u16) -> Self {
        EtherType(value)
    }

    /// Returns the raw 16-bit value.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::IPV4 => write!(f, "ipv4"),
            Self::VLAN => write!(f, "vlan"),
            Self::QINQ => write!(f, "qinq"),
            Self::EAPOL => write!(f, "eapol"),
            Self::LLDP => write!(f, "lldp"),
            EtherType(other) => write!(f, "0x{:04x}", other),
        }
    }
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        EtherType(value)
    }
}

impl From<EtherType> for u16 {
    fn from(etype: EtherType) -> u16 {
        etype.0
    }
}

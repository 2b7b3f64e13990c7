//! IP protocol numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An IP protocol number (the IPv4 protocol field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IpProtocol(u8);

impl IpProtocol {
    /// ICMP (1).
    pub const ICMP: IpProtocol = IpProtocol(1);

    /// IGMP (2).
    pub const IGMP: IpProtocol = IpProtocol(2);

    /// TCP (6).
    pub const TCP: IpProtocol = IpProtocol(6);

    /// UDP (17).
    pub const UDP: IpProtocol = IpProtocol(17);

    /// Creates a protocol number from its raw value.
    pub const fn new(value: u8) -> Self {
        IpProtocol(value)
    }

    /// Returns the raw protocol number.
    pub const fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for IpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ICMP => write!(f, "icmp"),
            Self::IGMP => write!(f, "igmp"),
            Self::TCP => write!(f, "tcp"),
            Self::UDP => write!(f, "udp"),
            IpProtocol(other) => write!(f, "{}", other),
        }
    }
}

impl From<u8> for IpProtocol {
    fn from(value: u8) -> Self {
        IpProtocol(value)
    }
}

impl From<IpProtocol> for u8 {
    fn from(proto: IpProtocol) -> u8 {
        proto.0
    }
}

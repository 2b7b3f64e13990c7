//! Device port numbers, including logical ports.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A device port number.
///
/// Physical ports occupy the low range; the reserved range at the top of
/// the 32-bit space encodes logical destinations, of which the pipeline
/// only uses [`PortNumber::CONTROLLER`] (punt to the control plane).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortNumber(u64);

impl PortNumber {
    /// First reserved (logical) port number.
    const LOGICAL_START: u64 = 0xffff_ff00;

    /// Logical port punting packets to the controller.
    pub const CONTROLLER: PortNumber = PortNumber(0xffff_fffd);

    /// Creates a port number.
    pub const fn new(port: u64) -> Self {
        PortNumber(port)
    }

    /// Returns the raw port number.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns true if this is a reserved logical port.
    pub const fn is_logical(&self) -> bool {
        self.0 >= Self::LOGICAL_START
    }
}

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::CONTROLLER {
            write!(f, "controller")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for PortNumber {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "controller" => Ok(PortNumber::CONTROLLER),
            other => other
                .parse::<u64>()
                .map(PortNumber)
                .map_err(|_| ParseError::InvalidPortNumber(s.to_string())),
        }
    }
}

impl From<u64> for PortNumber {
    fn from(port: u64) -> Self {
        PortNumber(port)
    }
}

impl From<PortNumber> for u64 {
    fn from(port: PortNumber) -> u64 {
        port.0
    }
}

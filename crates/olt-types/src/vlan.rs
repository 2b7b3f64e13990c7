//! VLAN ID type with sentinel encodings for pipeline match fields.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IEEE 802.1Q VLAN identifier as used in pipeline match fields.
///
/// Concrete identifiers occupy the 12-bit space 0-4095 (0 matches
/// priority-tagged frames). Two out-of-band sentinels extend the space:
/// [`VlanId::NONE`] matches untagged traffic and [`VlanId::ANY`] is the
/// wildcard that matches any tag. The sentinels participate in match
/// fields only and are never written onto the wire.
///
/// # Examples
///
/// ```
/// use olt_types::VlanId;
///
/// let ctag = VlanId::new(100).unwrap();
/// assert_eq!(ctag.as_u16(), 100);
///
/// assert!(VlanId::NONE.is_none());
/// assert!(VlanId::ANY.is_any());
/// assert!(VlanId::new(5000).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    /// Maximum concrete VLAN ID (12-bit space).
    pub const MAX: u16 = 4095;

    /// Matches untagged traffic (no VLAN header present).
    pub const NONE: VlanId = VlanId(0xFFFF);

    /// Wildcard: matches any VLAN tag.
    pub const ANY: VlanId = VlanId(0x1000);

    /// Creates a concrete VLAN ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is outside the 12-bit space (0-4095).
    /// Use the [`VlanId::NONE`] and [`VlanId::ANY`] constants for the
    /// sentinel encodings.
    pub const fn new(id: u16) -> Result<Self, ParseError> {
        if id <= Self::MAX {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id))
        }
    }

    /// Returns the raw 16-bit code, including sentinel encodings.
    ///
    /// This is the value packed into cross-table metadata fields.
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// Returns the concrete VLAN ID.
    ///
    /// Equal to [`raw`](Self::raw) for concrete IDs; callers matching on
    /// sentinels should check [`is_none`](Self::is_none) /
    /// [`is_any`](Self::is_any) first.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns true if this is the untagged sentinel.
    pub const fn is_none(&self) -> bool {
        self.0 == Self::NONE.0
    }

    /// Returns true if this is the any-VLAN wildcard.
    pub const fn is_any(&self) -> bool {
        self.0 == Self::ANY.0
    }

    /// Returns true if this is a concrete (wire-representable) VLAN ID.
    pub const fn is_concrete(&self) -> bool {
        self.0 <= Self::MAX
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else if self.is_any() {
            write!(f, "any")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for VlanId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(VlanId::NONE),
            "any" => Ok(VlanId::ANY),
            other => {
                let id: u16 = other.parse().map_err(|_| ParseError::InvalidVlanId(0))?;
                VlanId::new(id)
            }
        }
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        if id == Self::NONE.0 || id == Self::ANY.0 {
            Ok(VlanId(id))
        } else {
            VlanId::new(id)
        }
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}

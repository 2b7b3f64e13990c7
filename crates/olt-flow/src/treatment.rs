//! Treatment instructions with the two-phase execution partition.

use crate::flow::{MeterId, TableId};
use crate::group::GroupId;
use olt_types::{EtherType, PortNumber, VlanId};
use std::fmt;

/// A single packet-processing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Emit the packet on a port.
    Output(PortNumber),
    /// Hand the packet to a hardware group.
    Group(GroupId),
    /// Push a VLAN header with the given frame type.
    PushVlan(EtherType),
    /// Pop the outermost VLAN header.
    PopVlan,
    /// Set the VLAN ID of the outermost header.
    SetVlanId(VlanId),
    /// Apply a meter.
    Meter(MeterId),
    /// Continue processing in another table.
    Transition(TableId),
}

impl Instruction {
    /// Returns true for the VLAN push instruction.
    pub const fn is_vlan_push(&self) -> bool {
        matches!(self, Instruction::PushVlan(_))
    }

    /// Returns true for the VLAN pop instruction.
    pub const fn is_vlan_pop(&self) -> bool {
        matches!(self, Instruction::PopVlan)
    }

    /// Returns true for the VLAN ID rewrite instruction.
    pub const fn is_vlan_set(&self) -> bool {
        matches!(self, Instruction::SetVlanId(_))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Output(p) => write!(f, "OUTPUT:{}", p),
            Instruction::Group(g) => write!(f, "GROUP:0x{:x}", g),
            Instruction::PushVlan(t) => write!(f, "VLAN_PUSH:{}", t),
            Instruction::PopVlan => write!(f, "VLAN_POP"),
            Instruction::SetVlanId(v) => write!(f, "VLAN_ID:{}", v),
            Instruction::Meter(m) => write!(f, "METER:{}", m),
            Instruction::Transition(t) => write!(f, "TABLE:{}", t),
        }
    }
}

/// An ordered instruction list split into an immediate and a deferred
/// partition.
///
/// The split is a hardware pipeline contract: immediate instructions run
/// as the packet traverses the table, deferred instructions are accumulated
/// and run when the packet leaves the pipeline. Order within each partition
/// is preserved exactly as built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficTreatment {
    immediate: Vec<Instruction>,
    deferred: Vec<Instruction>,
}

impl TrafficTreatment {
    /// Returns a new treatment builder.
    pub fn builder() -> TreatmentBuilder {
        TreatmentBuilder::default()
    }

    /// The empty treatment (matched traffic is dropped).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the immediate-phase instructions.
    pub fn immediate(&self) -> &[Instruction] {
        &self.immediate
    }

    /// Returns the deferred-phase instructions.
    pub fn deferred(&self) -> &[Instruction] {
        &self.deferred
    }

    /// Returns all instructions, immediate partition first.
    pub fn all_instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.immediate.iter().chain(self.deferred.iter())
    }

    /// Returns true if both partitions are empty.
    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.deferred.is_empty()
    }

    /// Returns the first output instruction's port, if any.
    pub fn output(&self) -> Option<PortNumber> {
        self.all_instructions().find_map(|i| match i {
            Instruction::Output(p) => Some(*p),
            _ => None,
        })
    }

    /// Returns the meter instruction, if any.
    pub fn meter(&self) -> Option<MeterId> {
        self.all_instructions().find_map(|i| match i {
            Instruction::Meter(m) => Some(*m),
            _ => None,
        })
    }

    /// Returns the table-transition instruction, if any.
    pub fn table_transition(&self) -> Option<TableId> {
        self.all_instructions().find_map(|i| match i {
            Instruction::Transition(t) => Some(*t),
            _ => None,
        })
    }
}

impl fmt::Display for TrafficTreatment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[immediate=[")?;
        for (i, inst) in self.immediate.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", inst)?;
        }
        write!(f, "], deferred=[")?;
        for (i, inst) in self.deferred.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", inst)?;
        }
        write!(f, "]]")
    }
}

/// Builder for [`TrafficTreatment`].
///
/// Instructions are appended to the immediate partition until
/// [`deferred`](TreatmentBuilder::deferred) switches phases; the switch is
/// sticky until [`immediate`](TreatmentBuilder::immediate) switches back.
#[derive(Debug, Clone, Default)]
pub struct TreatmentBuilder {
    immediate: Vec<Instruction>,
    deferred: Vec<Instruction>,
    in_deferred: bool,
}

impl TreatmentBuilder {
    /// Appends an instruction to the current phase.
    pub fn add(mut self, instruction: Instruction) -> Self {
        if self.in_deferred {
            self.deferred.push(instruction);
        } else {
            self.immediate.push(instruction);
        }
        self
    }

    /// Appends an instruction if present; `None` is skipped.
    pub fn add_opt(self, instruction: Option<Instruction>) -> Self {
        match instruction {
            Some(i) => self.add(i),
            None => self,
        }
    }

    /// Switches to the deferred phase.
    pub fn deferred(mut self) -> Self {
        self.in_deferred = true;
        self
    }

    /// Switches back to the immediate phase.
    pub fn immediate(mut self) -> Self {
        self.in_deferred = false;
        self
    }

    /// Builds the treatment.
    pub fn build(self) -> TrafficTreatment {
        TrafficTreatment {
            immediate: self.immediate,
            deferred: self.deferred,
        }
    }
}

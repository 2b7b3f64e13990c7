//! Flow objective translator for OLT two-stage QinQ forwarding pipelines.
//!
//! An OLT-class access device forwards double-tagged (S-VLAN/C-VLAN)
//! subscriber traffic through a fixed two-table pipeline and punts
//! control-plane traffic (EAPOL, LLDP, IGMP, DHCP) to the controller.
//! This crate translates device-independent flow objectives into the
//! concrete rules and broadcast groups that pipeline requires.
//!
//! # Architecture
//!
//! ```text
//! [FilteringObjective] ──┐
//! [ForwardingObjective] ─┼──> [OltPipeliner] ──> [FlowRuleService] ──> tables 0/1
//! [NextObjective] ───────┘         │
//!                                  ├──> [GroupService] ──> broadcast groups
//!                                  │         │
//!                                  │    group events
//!                                  │         ▼
//!                                  └──< [PendingGroupCache] ──> [ObjectiveStore]
//! ```
//!
//! Translation is synchronous; hardware outcomes are delivered
//! asynchronously through each objective's context, exactly once. Group
//! confirmation follows a create-then-confirm protocol: `next()` records
//! a pending entry and returns, and the entry settles on a matching group
//! event or fails when its TTL lapses.
//!
//! # Key Components
//!
//! - [`OltPipeliner`]: entry points (`filter`, `forward`, `next`) and the
//!   group-event reconciler
//! - [`PendingGroupCache`]: time-bounded correlation of group requests to
//!   their next objectives
//! - [`OperationDispatcher`]: atomic rule batches with single-outcome
//!   delivery
//! - [`PipelinerConfig`]: per-device table layout and timing

mod config;
mod dispatch;
mod filtering;
mod forwarding;
mod pending;
mod pipeliner;

#[cfg(test)]
mod testutil;

pub use config::PipelinerConfig;
pub use dispatch::OperationDispatcher;
pub use pending::PendingGroupCache;
pub use pipeliner::OltPipeliner;

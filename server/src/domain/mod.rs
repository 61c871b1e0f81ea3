//! Wire-free domain model: agent snapshots, service details, status
//! derivation, and the ports the inbound adapters depend on.

pub mod events;
pub mod model;
pub mod ports;
pub mod range;
pub mod status;

pub use model::{
    AgentEvent, ControlTarget, HostInfo, Platform, ServiceKind, ServiceRecord, Snapshot,
};
pub use ports::{AgentAction, AgentCommander, ControlError};

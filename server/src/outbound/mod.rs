//! Outbound adapters: the embedded store and the agent control client.

pub mod control;
pub mod persistence;

#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]
//! Monitoring aggregator: ingests Monit agent XML snapshots, keeps current
//! state and append-only time series in an embedded store, and serves the
//! query, action, and product-compatible HTTP surfaces.

pub mod config;
pub mod decoder;
pub mod domain;
pub mod heartbeat;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

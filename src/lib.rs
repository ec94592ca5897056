//! metricwatch - verify that a running system emits every expected measurement
//!
//! Reporters track a fixed set of expected name patterns, settle each pattern
//! on its first matching notification, and expose a bounded wait that succeeds
//! once every pattern has been seen.

pub mod cli;
pub mod config;
pub mod error;
pub mod harness;
pub mod metrics;
pub mod reporter;
pub mod source;
pub mod telemetry;
pub mod tracker;

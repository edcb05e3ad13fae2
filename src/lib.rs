//! nodewatch - host health monitoring library
//!
//! This library exposes the control loop, probes, resource readers and
//! notification plumbing used by the `nodewatch` binary.

pub mod cli;
pub mod constants;
pub mod daemon;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod output;
pub mod probes;
pub mod resources;

//! Health-monitoring control loop
//!
//! - `state`: per-target warning flags with edge-triggered alerting
//! - `alerts`: alert line wording
//! - `remediator`: detached, time-bounded restarts
//! - `scheduler`: the periodic evaluation pass and its loop

pub mod alerts;
pub mod remediator;
pub mod scheduler;
pub mod state;

pub use remediator::{RemediationOutcome, Remediator};
pub use scheduler::{run_check, CheckResult, Monitor, TickReport};
pub use state::{ProcessTarget, ThresholdTarget, WarningFlag};

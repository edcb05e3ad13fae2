//! Per-target state carried between ticks
//!
//! Each target owns exactly one [`WarningFlag`]. The flag is the only state
//! used for alert edge detection; the last status/value is kept for status
//! queries and overwritten unconditionally every tick.

use crate::models::{ProbeKind, ProcessState, ResourceState, TargetStatus};
use crate::probes::HealthProbe;
use std::sync::Arc;

/// Edge-triggered "already warned" flag
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WarningFlag {
    armed: bool,
}

impl WarningFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.armed
    }

    /// Record one observation. Returns true only on the healthy-to-bad
    /// transition, i.e. when an alert line must be emitted.
    pub fn observe(&mut self, bad: bool) -> bool {
        if bad {
            let fired = !self.armed;
            self.armed = true;
            fired
        } else {
            self.armed = false;
            false
        }
    }
}

/// A monitored process and what was last seen of it
pub struct ProcessTarget {
    probe: Arc<dyn HealthProbe>,
    warning: WarningFlag,
    last_status: TargetStatus,
    last_error: Option<String>,
}

impl ProcessTarget {
    pub fn new(probe: Arc<dyn HealthProbe>) -> Self {
        Self {
            probe,
            warning: WarningFlag::new(),
            // Nothing observed yet
            last_status: TargetStatus::Unknown,
            last_error: None,
        }
    }

    pub fn probe(&self) -> &Arc<dyn HealthProbe> {
        &self.probe
    }

    pub fn name(&self) -> &str {
        self.probe.name()
    }

    pub fn kind(&self) -> ProbeKind {
        self.probe.kind()
    }

    pub fn warning(&self) -> bool {
        self.warning.is_set()
    }

    pub fn last_status(&self) -> TargetStatus {
        self.last_status
    }

    /// Apply one check result; returns true when an alert must be emitted
    pub fn record(&mut self, status: TargetStatus, error: Option<String>) -> bool {
        self.last_status = status;
        self.last_error = error;
        self.warning.observe(status.is_bad())
    }

    pub fn to_state(&self) -> ProcessState {
        ProcessState {
            identifier: self.name().to_string(),
            kind: self.kind(),
            status: self.last_status,
            warning: self.warning(),
            detail: self.last_error.clone(),
        }
    }
}

/// A usage ratio compared against a fixed limit
#[derive(Debug, Clone)]
pub struct ThresholdTarget {
    identifier: String,
    limit: f64,
    warning: WarningFlag,
    last_value: Option<f64>,
    last_error: Option<String>,
}

impl ThresholdTarget {
    pub fn new(identifier: impl Into<String>, limit: f64) -> Self {
        Self {
            identifier: identifier.into(),
            limit,
            warning: WarningFlag::new(),
            last_value: None,
            last_error: None,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn warning(&self) -> bool {
        self.warning.is_set()
    }

    /// A reading at or above the limit is a breach
    pub fn is_breach(&self, value: f64) -> bool {
        value >= self.limit
    }

    /// Apply a successful reading; returns true when an alert must be emitted
    pub fn record_value(&mut self, value: f64) -> bool {
        self.last_value = Some(value);
        self.last_error = None;
        let bad = self.is_breach(value);
        self.warning.observe(bad)
    }

    /// A failed reading counts as bad
    pub fn record_error(&mut self, error: String) -> bool {
        self.last_value = None;
        self.last_error = Some(error);
        self.warning.observe(true)
    }

    pub fn to_state(&self) -> ResourceState {
        ResourceState {
            identifier: self.identifier.clone(),
            limit: self.limit,
            value: self.last_value,
            warning: self.warning(),
            detail: self.last_error.clone(),
        }
    }
}

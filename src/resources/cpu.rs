//! Host-wide CPU utilisation via `sysinfo`.
//!
//! Utilisation needs two refreshes: sysinfo reports busy time between the
//! previous refresh and the current one. The sampler is owned by the caller
//! and keeps an explicit baseline flag, so the very first sample is always 0
//! instead of whatever happened to run since the `System` was built.

use crate::models::ResourceError;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// Two-sample CPU usage reader
#[derive(Debug)]
pub struct CpuSampler {
    system: System,
    baselined: bool,
}

impl CpuSampler {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage());
        Self {
            system: System::new_with_specifics(refresh_kind),
            baselined: false,
        }
    }

    /// Refresh CPU counters and return utilisation since the previous call.
    pub fn sample(&mut self) -> Result<f64, ResourceError> {
        self.system.refresh_cpu_usage();
        if self.system.cpus().is_empty() {
            return Err(ResourceError::Unavailable {
                resource: "cpu".to_string(),
                detail: "no CPUs reported".to_string(),
            });
        }
        Ok(self.observe(self.system.global_cpu_usage()))
    }

    /// Fold a global usage reading (percent) into the sampler.
    ///
    /// The first observation only sets the baseline and yields 0.
    pub fn observe(&mut self, percent: f32) -> f64 {
        if !std::mem::replace(&mut self.baselined, true) {
            return 0.0;
        }
        if !percent.is_finite() {
            return 0.0;
        }
        (f64::from(percent) / 100.0).clamp(0.0, 1.0)
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_zero() {
        let mut sampler = CpuSampler::new();
        assert_eq!(sampler.observe(99.0), 0.0);
        assert!((sampler.observe(75.0) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_readings_clamped() {
        let mut sampler = CpuSampler::new();
        sampler.observe(0.0);
        assert_eq!(sampler.observe(130.0), 1.0);
        assert_eq!(sampler.observe(-2.0), 0.0);
        assert_eq!(sampler.observe(f32::NAN), 0.0);
    }

    #[test]
    fn test_live_samples() {
        let mut sampler = CpuSampler::new();
        assert_eq!(sampler.sample().unwrap(), 0.0);
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        let usage = sampler.sample().unwrap();
        assert!((0.0..=1.0).contains(&usage));
    }
}

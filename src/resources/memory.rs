//! System memory usage via `sysinfo`.
//!
//! Usage is `1 - available/total`: available memory accounts for
//! reclaimable cache, so it is the kernel's own estimate of what a new
//! allocation can use without swapping.

use crate::models::ResourceError;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

/// Memory reader owning its own `sysinfo::System`
#[derive(Debug)]
pub struct MemoryReader {
    system: System,
}

impl MemoryReader {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram());
        Self {
            system: System::new_with_specifics(refresh_kind),
        }
    }

    /// Refresh RAM figures and return the fraction in use
    pub fn usage(&mut self) -> Result<f64, ResourceError> {
        self.system
            .refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
        memory_ratio(self.system.total_memory(), self.system.available_memory())
    }
}

impl Default for MemoryReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction of memory in use, clamped to [0, 1]
pub fn memory_ratio(total_bytes: u64, available_bytes: u64) -> Result<f64, ResourceError> {
    if total_bytes == 0 {
        return Err(ResourceError::Unavailable {
            resource: "memory".to_string(),
            detail: "total memory reported as zero".to_string(),
        });
    }
    Ok((1.0 - available_bytes as f64 / total_bytes as f64).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_ratio() {
        let ratio = memory_ratio(4_000_000, 1_000_000).unwrap();
        assert!((ratio - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_available_above_total_clamps() {
        assert_eq!(memory_ratio(100, 150).unwrap(), 0.0);
    }

    #[test]
    fn test_zero_total_is_error() {
        let err = memory_ratio(0, 0).unwrap_err();
        assert!(matches!(err, ResourceError::Unavailable { .. }));
    }

    #[test]
    fn test_live_memory() {
        let usage = MemoryReader::new().usage().unwrap();
        assert!((0.0..=1.0).contains(&usage));
    }
}

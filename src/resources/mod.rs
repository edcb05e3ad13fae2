//! Point-in-time readers for host resources
//!
//! Provides memory, CPU and filesystem usage figures:
//! - memory: `1 - available/total` from `sysinfo`
//! - cpu: two-refresh `sysinfo` reading held by an explicit sampler
//! - filesystem: `statvfs(3)` on each configured mount point
//!
//! Readers may block (a hung network mount blocks `statvfs`), so the control
//! loop calls them on blocking threads under a timeout. Methods take `&self`
//! for that reason; mutable sampler state sits behind a mutex.

pub mod cpu;
pub mod filesystem;
pub mod memory;

pub use cpu::CpuSampler;
pub use filesystem::read_filesystem_usage;
pub use memory::{memory_ratio, MemoryReader};

use crate::models::{FilesystemUsage, ResourceError};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Source of host resource readings consumed by the control loop
pub trait ResourceSource: Send + Sync {
    /// Fraction of memory in use
    fn memory_usage(&self) -> Result<f64, ResourceError>;

    /// Fraction of CPU time busy since the previous call; 0 on the first call
    fn cpu_usage(&self) -> Result<f64, ResourceError>;

    /// Capacity figures for the filesystem mounted at `path`
    fn filesystem_usage(&self, path: &Path) -> Result<FilesystemUsage, ResourceError>;
}

/// Readings taken from the live host
#[derive(Debug, Default)]
pub struct HostResources {
    memory: Mutex<MemoryReader>,
    cpu: Mutex<CpuSampler>,
}

impl HostResources {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reader state stays usable even if a previous reader panicked
fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ResourceSource for HostResources {
    fn memory_usage(&self) -> Result<f64, ResourceError> {
        relock(&self.memory).usage()
    }

    fn cpu_usage(&self) -> Result<f64, ResourceError> {
        relock(&self.cpu).sample()
    }

    fn filesystem_usage(&self, path: &Path) -> Result<FilesystemUsage, ResourceError> {
        read_filesystem_usage(path)
    }
}

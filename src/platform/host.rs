use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use crate::core::system_monitor::HostStats;
use crate::error::{MonitorError, Result};

/// Host accounting through `sysinfo`.
///
/// CPU usage is the load since the previous refresh, so the first reading
/// after construction is typically `0.0`, like any non-blocking sampler.
pub struct SysinfoHost {
    system: System,
}

impl SysinfoHost {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());

        Self {
            system: System::new_with_specifics(refresh_kind),
        }
    }
}

impl Default for SysinfoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostStats for SysinfoHost {
    fn cpu_percent(&mut self) -> Result<f32> {
        self.system.refresh_cpu_usage();
        if self.system.cpus().is_empty() {
            return Err(MonitorError::no_data("no CPUs reported"));
        }
        Ok(self.system.global_cpu_usage())
    }

    fn ram_percent(&mut self) -> Result<f32> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(MonitorError::no_data("total memory reported as zero"));
        }
        Ok((self.system.used_memory() as f64 / total as f64 * 100.0) as f32)
    }

    fn cpu_brand(&self) -> Option<String> {
        self.system
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
    }

    fn cpu_vendor_id(&self) -> Option<String> {
        self.system
            .cpus()
            .first()
            .map(|cpu| cpu.vendor_id().trim().to_string())
            .filter(|id| !id.is_empty())
    }
}

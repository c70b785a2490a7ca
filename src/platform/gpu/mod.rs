//! GPU-specific platform code.
//!
//! Backends for the NVML binding, vendor command-line tools, the OS sensor
//! subsystem and OS device enumeration.

mod enumerate;
mod nvidia_smi;
mod nvml;
mod rocm_smi;
mod sensors;

pub use enumerate::{parse_lspci, parse_video_controllers, CimVideoController, PciBusListing};
pub use nvidia_smi::NvidiaSmi;
pub use nvml::{bundled_library_path, NvmlBackend};
pub use rocm_smi::{split_csv_line, RocmSmi};
pub use sensors::{pick_gpu_temperatures, SensorGpu};

use std::time::Duration;

use crate::core::system_monitor::GpuBackend;

/// GPU backends for this host in priority order:
/// 1. NVIDIA via NVML (only if the binding loaded)
/// 2. NVIDIA via `nvidia-smi`
/// 3. AMD via `rocm-smi`
/// 4. OS sensors (temperatures only)
/// 5. OS enumeration (`lspci` or CIM)
pub fn default_gpu_backends(timeout: Duration) -> Vec<Box<dyn GpuBackend>> {
    let mut backends: Vec<Box<dyn GpuBackend>> = Vec::new();

    match NvmlBackend::probe() {
        Ok(backend) => backends.push(Box::new(backend)),
        Err(e) => log::debug!("Skipping NVML backend: {}", e),
    }

    backends.push(Box::new(NvidiaSmi::new(timeout)));
    backends.push(Box::new(RocmSmi::new(timeout)));
    backends.push(Box::new(SensorGpu));

    #[cfg(windows)]
    backends.push(Box::new(CimVideoController::new(timeout)));
    #[cfg(not(windows))]
    backends.push(Box::new(PciBusListing::new(timeout)));

    backends
}

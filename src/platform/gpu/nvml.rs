#[cfg(feature = "nvml")]
use nvml_wrapper::{enum_wrappers::device::TemperatureSensor, Nvml};
#[cfg(feature = "nvml")]
use once_cell::sync::Lazy;

use crate::core::system_monitor::{GpuBackend, GpuDevice, GpuReading, GpuVendor};
use crate::error::{MonitorError, Result};

/// Singleton - NVML must be initialized ONCE only.
///
/// The library is looked up through the system loader first, then next to
/// the running executable so a copy shipped with the application is found.
#[cfg(feature = "nvml")]
static NVML: Lazy<Option<Nvml>> = Lazy::new(load_nvml);

#[cfg(feature = "nvml")]
fn load_nvml() -> Option<Nvml> {
    match Nvml::init() {
        Ok(nvml) => {
            log::info!("NVML loaded from system library path");
            return Some(nvml);
        }
        Err(e) => log::debug!("NVML not on system library path: {}", e),
    }

    let candidate = bundled_library_path()?;
    match Nvml::builder().lib_path(candidate.as_os_str()).init() {
        Ok(nvml) => {
            log::info!("NVML loaded from {:?}", candidate);
            Some(nvml)
        }
        Err(e) => {
            log::debug!("NVML not loadable from {:?}: {}", candidate, e);
            None
        }
    }
}

/// NVML library file next to the executable, if one exists
pub fn bundled_library_path() -> Option<std::path::PathBuf> {
    #[cfg(windows)]
    const LIB_NAME: &str = "nvml.dll";
    #[cfg(not(windows))]
    const LIB_NAME: &str = "libnvidia-ml.so.1";

    let exe = std::env::current_exe().ok()?;
    let path = exe.parent()?.join(LIB_NAME);
    path.exists().then_some(path)
}

/// NVIDIA GPUs through the NVML binding
pub struct NvmlBackend {
    #[cfg(feature = "nvml")]
    nvml: &'static Nvml,
}

impl NvmlBackend {
    /// Probe the binding. The load is attempted once per process; later
    /// probes reuse that outcome.
    pub fn probe() -> Result<Self> {
        #[cfg(feature = "nvml")]
        {
            let nvml = NVML
                .as_ref()
                .ok_or_else(|| MonitorError::binding_unavailable("NVML library not loadable"))?;
            Ok(Self { nvml })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(MonitorError::binding_unavailable(
                "NVML support not enabled",
            ))
        }
    }
}

impl GpuBackend for NvmlBackend {
    fn name(&self) -> &'static str {
        "nvml"
    }

    fn vendor(&self) -> Option<GpuVendor> {
        Some(GpuVendor::Nvidia)
    }

    fn inventory(&self) -> Result<Vec<GpuDevice>> {
        #[cfg(feature = "nvml")]
        {
            let count = self
                .nvml
                .device_count()
                .map_err(|e| MonitorError::binding_unavailable(format!("device count: {}", e)))?;

            let mut devices = Vec::with_capacity(count as usize);
            for index in 0..count {
                let device = match self.nvml.device_by_index(index) {
                    Ok(device) => device,
                    Err(e) => {
                        log::debug!("NVML device {} unavailable: {}", index, e);
                        continue;
                    }
                };

                let name = device
                    .name()
                    .unwrap_or_else(|_| "Unknown NVIDIA GPU".to_string());
                let gpu = GpuDevice::new(name, GpuVendor::Nvidia);
                devices.push(match device.uuid() {
                    Ok(uuid) => gpu.with_id(uuid),
                    Err(_) => gpu,
                });
            }
            Ok(devices)
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(MonitorError::binding_unavailable(
                "NVML support not enabled",
            ))
        }
    }

    fn readings(&self) -> Result<Vec<GpuReading>> {
        #[cfg(feature = "nvml")]
        {
            let count = self
                .nvml
                .device_count()
                .map_err(|e| MonitorError::binding_unavailable(format!("device count: {}", e)))?;

            Ok((0..count)
                .filter_map(|index| self.nvml.device_by_index(index).ok())
                .map(|device| GpuReading {
                    id: device.uuid().ok(),
                    usage_percent: device.utilization_rates().ok().map(|u| u.gpu as f32),
                    temp_celsius: device
                        .temperature(TemperatureSensor::Gpu)
                        .ok()
                        .map(|t| t as f32),
                })
                .collect())
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(MonitorError::binding_unavailable(
                "NVML support not enabled",
            ))
        }
    }
}

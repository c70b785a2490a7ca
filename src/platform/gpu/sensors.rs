use crate::core::system_monitor::{GpuBackend, GpuDevice, GpuReading, GpuVendor};
use crate::error::{MonitorError, Result};
use crate::platform::cpu::sensor_readings;

/// Sensor chips that belong to GPU drivers
pub const GPU_SENSOR_CHIPS: &[&str] = &["amdgpu", "nvidia", "nouveau", "radeon", "i915", "xe ", "gpu"];

/// GPU temperatures from the OS sensor subsystem (hwmon on Linux).
///
/// Reports temperatures only; it cannot enumerate GPUs by itself.
pub struct SensorGpu;

impl GpuBackend for SensorGpu {
    fn name(&self) -> &'static str {
        "sensors"
    }

    fn vendor(&self) -> Option<GpuVendor> {
        None
    }

    fn inventory(&self) -> Result<Vec<GpuDevice>> {
        Err(MonitorError::unsupported("sensors cannot enumerate GPUs"))
    }

    fn readings(&self) -> Result<Vec<GpuReading>> {
        let temps = pick_gpu_temperatures(&sensor_readings());
        if temps.is_empty() {
            return Err(MonitorError::no_data("no GPU sensor chip"));
        }
        Ok(temps.into_iter().map(GpuReading::temperature).collect())
    }
}

/// One temperature per GPU sensor, in sensor order.
///
/// Secondary amdgpu sensors (junction, memory) are skipped so each card
/// contributes its edge reading only.
pub fn pick_gpu_temperatures(readings: &[(String, Option<f32>)]) -> Vec<f32> {
    readings
        .iter()
        .filter_map(|(label, temp)| {
            let label = label.to_ascii_lowercase();
            let is_gpu = GPU_SENSOR_CHIPS.iter().any(|chip| label.contains(chip));
            let secondary = label.contains("junction") || label.contains("mem");
            let temp = (*temp)?;
            (is_gpu && !secondary && temp.is_finite()).then_some(temp)
        })
        .collect()
}

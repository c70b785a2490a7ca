use std::time::Duration;

use crate::core::system_monitor::{parse_reading, GpuBackend, GpuDevice, GpuReading, GpuVendor};
use crate::error::{MonitorError, Result};
use crate::platform::command::run_tool;

const TOOL: &str = "nvidia-smi";

/// NVIDIA GPUs through the `nvidia-smi` command-line tool
pub struct NvidiaSmi {
    timeout: Duration,
}

impl NvidiaSmi {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl GpuBackend for NvidiaSmi {
    fn name(&self) -> &'static str {
        TOOL
    }

    fn vendor(&self) -> Option<GpuVendor> {
        Some(GpuVendor::Nvidia)
    }

    fn inventory(&self) -> Result<Vec<GpuDevice>> {
        let stdout = run_tool(
            TOOL,
            &["--query-gpu=uuid,name", "--format=csv,noheader"],
            self.timeout,
        )?;
        parse_inventory(&stdout)
    }

    fn readings(&self) -> Result<Vec<GpuReading>> {
        let stdout = run_tool(
            TOOL,
            &[
                "--query-gpu=uuid,utilization.gpu,temperature.gpu",
                "--format=csv,noheader,nounits",
            ],
            self.timeout,
        )?;
        Ok(parse_readings(&stdout))
    }
}

/// Parse `uuid, name` lines
pub fn parse_inventory(stdout: &str) -> Result<Vec<GpuDevice>> {
    let devices: Vec<GpuDevice> = stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let (uuid, name) = line.split_once(',')?;
            let (uuid, name) = (uuid.trim(), name.trim());
            if name.is_empty() {
                return None;
            }
            let device = GpuDevice::new(name, GpuVendor::Nvidia);
            Some(if uuid.is_empty() { device } else { device.with_id(uuid) })
        })
        .collect();

    if devices.is_empty() && !stdout.trim().is_empty() {
        return Err(MonitorError::parse(format!(
            "unexpected {} inventory output: {:?}",
            TOOL,
            stdout.trim()
        )));
    }

    Ok(devices)
}

/// Parse `uuid, utilization, temperature` lines.
///
/// A field that does not parse (`[N/A]`, `[Not Supported]`) only blanks
/// that value; the row is still reported so positions stay aligned.
pub fn parse_readings(stdout: &str) -> Vec<GpuReading> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut fields = line.split(',').map(str::trim);
            let id = fields.next().filter(|id| !id.is_empty()).map(str::to_string);
            GpuReading {
                id,
                usage_percent: fields.next().and_then(parse_reading),
                temp_celsius: fields.next().and_then(parse_reading),
            }
        })
        .collect()
}

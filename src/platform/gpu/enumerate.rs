//! Last-resort GPU enumeration through OS device listings.
//!
//! These backends know names only; they never report usage or temperature.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::core::system_monitor::{GpuBackend, GpuDevice, GpuReading, GpuVendor};
use crate::error::{MonitorError, Result};
use crate::platform::command::{parse_json_list, run_tool};

static LSPCI_DISPLAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<slot>\S+)\s+(?:VGA compatible controller|3D controller|Display controller)(?: \[[0-9a-f]{4}\])?:\s+(?P<name>.+?)(?:\s+\(rev [0-9a-f]+\))?$",
    )
    .expect("valid lspci regex")
});

const CIM_VIDEO_CONTROLLERS: &str = "Get-CimInstance Win32_VideoController \
     | Select-Object Name, PNPDeviceID \
     | ConvertTo-Json";

/// PCI bus listing via `lspci` (Unix-likes)
pub struct PciBusListing {
    timeout: Duration,
}

impl PciBusListing {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl GpuBackend for PciBusListing {
    fn name(&self) -> &'static str {
        "lspci"
    }

    fn vendor(&self) -> Option<GpuVendor> {
        None
    }

    fn inventory(&self) -> Result<Vec<GpuDevice>> {
        let stdout = run_tool("lspci", &[], self.timeout)?;
        Ok(parse_lspci(&stdout))
    }

    fn readings(&self) -> Result<Vec<GpuReading>> {
        Err(MonitorError::unsupported("lspci has no live readings"))
    }
}

/// Display controllers from plain `lspci` output
pub fn parse_lspci(stdout: &str) -> Vec<GpuDevice> {
    stdout
        .lines()
        .filter_map(|line| LSPCI_DISPLAY.captures(line.trim()))
        .map(|caps| {
            let name = caps["name"].trim().to_string();
            let vendor = GpuVendor::from_name(&name);
            GpuDevice::new(name, vendor).with_id(&caps["slot"])
        })
        .collect()
}

/// `Win32_VideoController` through CIM (Windows)
pub struct CimVideoController {
    timeout: Duration,
}

impl CimVideoController {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl GpuBackend for CimVideoController {
    fn name(&self) -> &'static str {
        "cim-video-controller"
    }

    fn vendor(&self) -> Option<GpuVendor> {
        None
    }

    fn inventory(&self) -> Result<Vec<GpuDevice>> {
        let stdout = run_tool(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", CIM_VIDEO_CONTROLLERS],
            self.timeout,
        )?;
        parse_video_controllers(&stdout)
    }

    fn readings(&self) -> Result<Vec<GpuReading>> {
        Err(MonitorError::unsupported("CIM has no live readings"))
    }
}

#[derive(Debug, Deserialize)]
struct VideoController {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "PNPDeviceID")]
    pnp_device_id: Option<String>,
}

/// Video controllers from `ConvertTo-Json` output, minus the basic display adapter
pub fn parse_video_controllers(stdout: &str) -> Result<Vec<GpuDevice>> {
    let controllers: Vec<VideoController> = parse_json_list(stdout)?;

    Ok(controllers
        .into_iter()
        .filter_map(|c| {
            let name = c.name?.trim().to_string();
            if name.is_empty() || name.contains("Basic Display") {
                return None;
            }
            let device = GpuDevice::new(name.clone(), GpuVendor::from_name(&name));
            Some(match c.pnp_device_id {
                Some(id) => device.with_id(id),
                None => device,
            })
        })
        .collect())
}

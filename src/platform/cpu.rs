//! CPU identity lookups and CPU temperature sources.

use std::time::Duration;

use sysinfo::Components;

use crate::core::system_monitor::CpuTempSource;
use crate::error::{MonitorError, Result};

/// Sensor chips and labels that carry the CPU package temperature, best first
pub const CPU_SENSOR_CHIPS: &[&str] = &[
    "k10temp",
    "package id",
    "coretemp",
    "zenpower",
    "cpu_thermal",
    "cpu-thermal",
    "soc_thermal",
    "tctl",
    "tdie",
    "acpitz",
];

/// Look up the processor name without the host accounting interface.
///
/// `/proc/cpuinfo` on Linux, the registry on Windows, then the CPUID brand
/// string on x86.
pub fn lookup_cpu_name() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        if let Some(name) = std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|text| parse_cpuinfo_model(&text))
        {
            return Some(name);
        }
    }

    #[cfg(windows)]
    {
        if let Some(name) = registry_cpu_name() {
            return Some(name);
        }
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if let Some(name) = cpuid_brand() {
            return Some(name);
        }
    }

    None
}

/// Extract the model line from `/proc/cpuinfo` text (x86 and ARM layouts)
pub fn parse_cpuinfo_model(text: &str) -> Option<String> {
    for key in ["model name", "Hardware", "Processor", "Model"] {
        let found = text.lines().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            (k.trim() == key && !v.trim().is_empty()).then(|| v.trim().to_string())
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

#[cfg(windows)]
fn registry_cpu_name() -> Option<String> {
    use winreg::enums::HKEY_LOCAL_MACHINE;
    use winreg::RegKey;

    let key = RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey(r"HARDWARE\DESCRIPTION\System\CentralProcessor\0")
        .ok()?;
    let name: String = key.get_value("ProcessorNameString").ok()?;
    let name = name.trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn cpuid_brand() -> Option<String> {
    let brand = raw_cpuid::CpuId::new().get_processor_brand_string()?;
    let brand = brand.as_str().trim().to_string();
    (!brand.is_empty()).then_some(brand)
}

/// Manufacturer from a CPUID vendor id
pub fn vendor_from_id(vendor_id: &str) -> Option<&'static str> {
    match vendor_id.trim() {
        "GenuineIntel" => Some("Intel"),
        "AuthenticAMD" => Some("AMD"),
        "HygonGenuine" => Some("Hygon"),
        "CentaurHauls" | "Shanghai" => Some("Zhaoxin"),
        "Apple" => Some("Apple"),
        _ => None,
    }
}

/// Manufacturer guessed from a processor name
pub fn vendor_from_name(name: &str) -> Option<&'static str> {
    let name = name.to_ascii_lowercase();

    if name.contains("intel") {
        Some("Intel")
    } else if name.contains("amd") || name.contains("ryzen") {
        Some("AMD")
    } else if name.contains("apple") {
        Some("Apple")
    } else if name.contains("qualcomm") || name.contains("snapdragon") {
        Some("Qualcomm")
    } else {
        None
    }
}

/// Pick the CPU temperature from `(label, temperature)` sensor readings.
///
/// Chips are tried in [`CPU_SENSOR_CHIPS`] order; the first finite reading
/// of the best matching chip wins.
pub fn pick_cpu_temperature(readings: &[(String, Option<f32>)]) -> Option<f32> {
    CPU_SENSOR_CHIPS.iter().find_map(|chip| {
        readings.iter().find_map(|(label, temp)| {
            let temp = (*temp)?;
            (label.to_ascii_lowercase().contains(chip) && temp.is_finite()).then_some(temp)
        })
    })
}

/// Snapshot of every hwmon / sensor reading as `(label, temperature)`
pub fn sensor_readings() -> Vec<(String, Option<f32>)> {
    let components = Components::new_with_refreshed_list();
    components
        .iter()
        .map(|comp| (comp.label().to_string(), comp.temperature()))
        .collect()
}

/// CPU temperature from the OS sensor subsystem
pub struct SensorChips;

impl CpuTempSource for SensorChips {
    fn name(&self) -> &'static str {
        "sensors"
    }

    fn cpu_temperature(&self) -> Result<f32> {
        pick_cpu_temperature(&sensor_readings())
            .ok_or_else(|| MonitorError::no_data("no known CPU sensor chip"))
    }
}

/// Convert an ACPI thermal-zone reading (tenths of Kelvin) to Celsius
pub fn deci_kelvin_to_celsius(deci_kelvin: f64) -> f32 {
    (deci_kelvin / 10.0 - 273.15) as f32
}

/// ACPI thermal zone through CIM (`MSAcpi_ThermalZoneTemperature`)
#[cfg(windows)]
pub struct ThermalZone {
    timeout: Duration,
}

#[cfg(windows)]
impl ThermalZone {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[cfg(windows)]
impl CpuTempSource for ThermalZone {
    fn name(&self) -> &'static str {
        "thermal-zone"
    }

    fn cpu_temperature(&self) -> Result<f32> {
        #[derive(serde::Deserialize)]
        struct Zone {
            #[serde(rename = "CurrentTemperature")]
            current_temperature: Option<f64>,
        }

        let zones: Vec<Zone> = super::command::run_powershell_json(
            "Get-CimInstance -Namespace root/wmi -ClassName MSAcpi_ThermalZoneTemperature \
             | Select-Object CurrentTemperature \
             | ConvertTo-Json",
            self.timeout,
        )?;

        zones
            .iter()
            .filter_map(|z| z.current_temperature)
            .find(|t| *t > 0.0)
            .map(deci_kelvin_to_celsius)
            .ok_or_else(|| MonitorError::no_data("no thermal zone reading"))
    }
}

/// CPU temperature sources for this platform, best first
pub fn default_cpu_temp_sources(timeout: Duration) -> Vec<Box<dyn CpuTempSource>> {
    #[allow(unused_mut)]
    let mut sources: Vec<Box<dyn CpuTempSource>> = vec![Box::new(SensorChips)];

    #[cfg(windows)]
    sources.push(Box::new(ThermalZone::new(timeout)));

    #[cfg(not(windows))]
    let _ = timeout;

    sources
}

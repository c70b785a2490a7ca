use super::metrics::{GpuDevice, GpuReading, GpuVendor};
use crate::error::Result;

/// Host accounting interface (CPU load, memory, processor identity)
///
/// The default implementation lives in the platform layer and wraps
/// `sysinfo`. Tests substitute their own.
pub trait HostStats: Send {
    /// Global CPU load since the previous call, in percent
    fn cpu_percent(&mut self) -> Result<f32>;

    /// Physical memory in use, in percent
    fn ram_percent(&mut self) -> Result<f32>;

    /// Processor brand string, if the host reports one
    fn cpu_brand(&self) -> Option<String>;

    /// Raw vendor id (`GenuineIntel`, `AuthenticAMD`, ...)
    fn cpu_vendor_id(&self) -> Option<String>;
}

/// One way of discovering GPUs and reading their live values
///
/// Vendor-specific backends (`vendor()` returns `Some`) compete per vendor;
/// generic enumerators return `None` and are only consulted when no vendor
/// backend found anything.
pub trait GpuBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn vendor(&self) -> Option<GpuVendor>;

    /// Detect GPUs. Expensive: usually spawns a process.
    fn inventory(&self) -> Result<Vec<GpuDevice>>;

    /// Current usage/temperature, one entry per GPU this backend knows
    fn readings(&self) -> Result<Vec<GpuReading>>;
}

/// One way of reading the CPU package temperature
pub trait CpuTempSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn cpu_temperature(&self) -> Result<f32>;
}

/// Try `probes` in order and return the first `Ok` value accepted by `accept`.
///
/// Failures are logged at debug level and otherwise ignored.
pub fn first_available<'a, B, T, F, A>(probes: &'a [B], mut probe: F, accept: A) -> Option<T>
where
    B: 'a,
    F: FnMut(&'a B) -> (&'static str, Result<T>),
    A: Fn(&T) -> bool,
{
    for backend in probes {
        match probe(backend) {
            (_, Ok(value)) if accept(&value) => return Some(value),
            (name, Ok(_)) => log::debug!("{}: returned nothing usable", name),
            (name, Err(e)) => log::debug!("{}: unavailable: {}", name, e),
        }
    }
    None
}

/// Parse a numeric field from tool output.
///
/// Placeholders like `[N/A]` or `N/A` and anything non-numeric become `None`.
pub fn parse_reading(raw: &str) -> Option<f32> {
    let value = raw.trim().trim_end_matches('%').trim();
    match value.parse::<f32>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

// overlay-monitor library - public API

pub mod error;
pub use error::{MonitorError, Result};

pub mod commands;
pub mod core;
pub mod platform;

// Re-export commonly used types
pub use core::config::{MonitorSettings, OverlayConfig};
pub use core::system_monitor::{
    GpuBackend, GpuDevice, GpuReading, GpuSample, GpuVendor, MetricSample, MetricsAggregator,
};

/// Initialize logging. Defaults to `warn`, overridable through `RUST_LOG`.
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}

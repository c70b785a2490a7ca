//! System monitoring core functionality.
//!
//! The metrics aggregator and the backend traits it polls. Concrete backends
//! (sysinfo, vendor tools, NVML, OS enumeration) live in the platform layer.

mod aggregator;
mod backend;
mod inventory;
mod metrics;

pub use aggregator::{AggregatorBuilder, MetricsAggregator};
pub use backend::{first_available, parse_reading, CpuTempSource, GpuBackend, HostStats};
pub use inventory::{backend_order, pair_bucket, InventoryCache, InventoryEntry};
pub use metrics::{GpuDevice, GpuReading, GpuSample, GpuVendor, MetricSample};

// Platform-specific code module

pub mod command;
pub mod cpu;
pub mod gpu;
pub mod host;

// Re-exports for cleaner imports
pub use command::{run_powershell_json, run_tool};
pub use cpu::{lookup_cpu_name, SensorChips};
pub use host::SysinfoHost;

// Command handlers module
pub mod config;
pub mod gpus;
pub mod watch;

// Re-exports for cleaner imports
pub use gpus::execute as gpus;
pub use watch::execute as watch;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_GPU_CACHE_SECS: u64 = 10;
pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 2000;
/// Floor applied to a hand-edited `tool_timeout_ms`
pub const MIN_TOOL_TIMEOUT_MS: u64 = 100;

/// Overlay settings persisted as JSON.
///
/// Missing keys take their defaults and unknown keys are ignored, so files
/// written by older or newer versions still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub update_interval_ms: u64,
    pub gpu_cache_secs: u64,
    pub tool_timeout_ms: u64,
    pub show_time: bool,
    pub show_cpu: bool,
    pub show_ram: bool,
    pub show_gpu: bool,
    pub show_cpu_temp: bool,
    pub show_gpu_temp: bool,
    pub show_cpu_name: bool,
    pub show_gpu_name: bool,
    pub show_cpu_manufacturer: bool,
    pub show_gpu_manufacturer: bool,
    /// Per-GPU visibility keyed by display name. Missing means visible.
    pub gpu_visibility: BTreeMap<String, bool>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            gpu_cache_secs: DEFAULT_GPU_CACHE_SECS,
            tool_timeout_ms: DEFAULT_TOOL_TIMEOUT_MS,
            show_time: true,
            show_cpu: true,
            show_ram: true,
            show_gpu: true,
            show_cpu_temp: false,
            show_gpu_temp: false,
            show_cpu_name: false,
            show_gpu_name: false,
            show_cpu_manufacturer: false,
            show_gpu_manufacturer: false,
            gpu_visibility: BTreeMap::new(),
        }
    }
}

/// The part of the configuration the metrics aggregator cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub inventory_window: Duration,
    pub tool_timeout: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            inventory_window: Duration::from_secs(DEFAULT_GPU_CACHE_SECS),
            tool_timeout: Duration::from_millis(DEFAULT_TOOL_TIMEOUT_MS),
        }
    }
}

impl OverlayConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`; a missing, empty or unreadable-as-JSON file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_json::from_str(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring corrupt config {:?}: {}", path, e);
            Self::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, data).with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("overlay-monitor").join("config.json"))
    }

    /// Update one top-level key from its textual form.
    ///
    /// `raw` is read as JSON first (`true`, `250`) and as a plain string
    /// otherwise. Unknown keys and values of the wrong type are rejected.
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut doc = serde_json::to_value(&*self).context("Failed to serialize config")?;

        let fields = doc
            .as_object_mut()
            .context("Config did not serialize to an object")?;

        if !fields.contains_key(key) {
            bail!("Unknown config key: {}", key);
        }

        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        fields.insert(key.to_string(), value);

        let updated: OverlayConfig = serde_json::from_value(doc)
            .with_context(|| format!("Invalid value for {}: {}", key, raw))?;

        if updated.update_interval_ms == 0 {
            bail!("update_interval_ms must be greater than zero");
        }
        if updated.tool_timeout_ms == 0 {
            bail!("tool_timeout_ms must be greater than zero");
        }

        *self = updated;
        Ok(())
    }

    pub fn is_gpu_visible(&self, name: &str) -> bool {
        self.gpu_visibility.get(name).copied().unwrap_or(true)
    }

    pub fn set_gpu_visible(&mut self, name: &str, visible: bool) {
        self.gpu_visibility.insert(name.to_string(), visible);
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.max(1))
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            inventory_window: Duration::from_secs(self.gpu_cache_secs),
            tool_timeout: Duration::from_millis(self.tool_timeout_ms.max(MIN_TOOL_TIMEOUT_MS)),
        }
    }
}

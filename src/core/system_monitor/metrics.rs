use serde::{Deserialize, Serialize};

/// One complete metrics readout taken at a single point in time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: i64, // Unix timestamp
    pub time: String,   // Local HH:MM:SS
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub cpu_temp_celsius: Option<f32>,
    pub gpus: Vec<GpuSample>,
}

/// Live view of one GPU.
///
/// `usage_percent` and `temp_celsius` are `None` when no backend could read
/// them, which is different from a GPU that is idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuSample {
    pub name: String,
    pub vendor: GpuVendor,
    pub usage_percent: Option<f32>,
    pub temp_celsius: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    #[default]
    Other,
}

impl GpuVendor {
    /// Guess the vendor from a marketing or bus-listing name
    pub fn from_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();

        if name.contains("nvidia") || name.contains("geforce") || name.contains("quadro") {
            GpuVendor::Nvidia
        } else if name.contains("amd") || name.contains("radeon") || name.contains("ati ") {
            GpuVendor::Amd
        } else if name.contains("intel") {
            GpuVendor::Intel
        } else {
            GpuVendor::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GpuVendor::Nvidia => "NVIDIA",
            GpuVendor::Amd => "AMD",
            GpuVendor::Intel => "Intel",
            GpuVendor::Other => "Other",
        }
    }
}

/// An inventory entry: a detected GPU without live values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuDevice {
    pub name: String,
    pub vendor: GpuVendor,
    /// Stable identifier when the tool exposes one (NVIDIA UUID, rocm-smi card)
    pub id: Option<String>,
}

impl GpuDevice {
    pub fn new<S: Into<String>>(name: S, vendor: GpuVendor) -> Self {
        Self {
            name: name.into(),
            vendor,
            id: None,
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Live values for one GPU as reported by a backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuReading {
    pub id: Option<String>,
    pub usage_percent: Option<f32>,
    pub temp_celsius: Option<f32>,
}

impl GpuReading {
    pub fn usage(usage_percent: f32) -> Self {
        Self {
            usage_percent: Some(usage_percent),
            ..Default::default()
        }
    }

    pub fn temperature(temp_celsius: f32) -> Self {
        Self {
            temp_celsius: Some(temp_celsius),
            ..Default::default()
        }
    }
}

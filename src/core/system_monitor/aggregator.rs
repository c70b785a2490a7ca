use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::backend::{first_available, CpuTempSource, GpuBackend, HostStats};
use super::inventory::{backend_order, pair_bucket, InventoryCache, InventoryEntry};
use super::metrics::{GpuDevice, GpuSample, GpuVendor, MetricSample};
use crate::core::config::{MonitorSettings, OverlayConfig};
use crate::platform;

const FALLBACK_CPU_NAME: &str = "CPU";

/// Best-effort metrics source for the overlay.
///
/// Every public method returns plain values. Backend failures only make the
/// affected field absent (or `0.0` where the API has no absent form).
///
/// Mutable state sits behind mutexes so one aggregator can be shared between
/// pollers; the inventory refresh happens under the cache lock.
pub struct MetricsAggregator {
    host: Mutex<Box<dyn HostStats>>,
    gpu_backends: Vec<Box<dyn GpuBackend>>,
    cpu_temp_sources: Vec<Box<dyn CpuTempSource>>,
    inventory: Mutex<InventoryCache>,
    inventory_window: Duration,
    cpu_name: Mutex<Option<String>>,
    cpu_name_lookup: fn() -> Option<String>,
}

/// Assembles a [`MetricsAggregator`] from explicit backends
pub struct AggregatorBuilder {
    host: Box<dyn HostStats>,
    gpu_backends: Vec<Box<dyn GpuBackend>>,
    cpu_temp_sources: Vec<Box<dyn CpuTempSource>>,
    inventory_window: Duration,
    cpu_name_lookup: fn() -> Option<String>,
}

impl AggregatorBuilder {
    /// Append a GPU backend. Order of calls is priority order.
    pub fn gpu_backend(mut self, backend: Box<dyn GpuBackend>) -> Self {
        self.gpu_backends.push(backend);
        self
    }

    pub fn gpu_backends(mut self, backends: Vec<Box<dyn GpuBackend>>) -> Self {
        self.gpu_backends.extend(backends);
        self
    }

    /// Append a CPU temperature source. Order of calls is priority order.
    pub fn cpu_temp_source(mut self, source: Box<dyn CpuTempSource>) -> Self {
        self.cpu_temp_sources.push(source);
        self
    }

    pub fn cpu_temp_sources(mut self, sources: Vec<Box<dyn CpuTempSource>>) -> Self {
        self.cpu_temp_sources.extend(sources);
        self
    }

    pub fn inventory_window(mut self, window: Duration) -> Self {
        self.inventory_window = window;
        self
    }

    /// Replace the platform lookup used when the host reports no CPU brand
    pub fn cpu_name_lookup(mut self, lookup: fn() -> Option<String>) -> Self {
        self.cpu_name_lookup = lookup;
        self
    }

    pub fn build(self) -> MetricsAggregator {
        MetricsAggregator {
            host: Mutex::new(self.host),
            gpu_backends: self.gpu_backends,
            cpu_temp_sources: self.cpu_temp_sources,
            inventory: Mutex::new(InventoryCache::default()),
            inventory_window: self.inventory_window,
            cpu_name: Mutex::new(None),
            cpu_name_lookup: self.cpu_name_lookup,
        }
    }
}

impl MetricsAggregator {
    /// Aggregator wired to the backends available on this host
    pub fn new() -> Self {
        Self::with_settings(&MonitorSettings::default())
    }

    pub fn with_settings(settings: &MonitorSettings) -> Self {
        Self::builder(Box::new(platform::SysinfoHost::new()))
            .gpu_backends(platform::gpu::default_gpu_backends(settings.tool_timeout))
            .cpu_temp_sources(platform::cpu::default_cpu_temp_sources(settings.tool_timeout))
            .inventory_window(settings.inventory_window)
            .build()
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::with_settings(&config.monitor_settings())
    }

    /// Start from a host accounting backend with no GPU or sensor backends
    pub fn builder(host: Box<dyn HostStats>) -> AggregatorBuilder {
        AggregatorBuilder {
            host,
            gpu_backends: Vec::new(),
            cpu_temp_sources: Vec::new(),
            inventory_window: MonitorSettings::default().inventory_window,
            cpu_name_lookup: platform::cpu::lookup_cpu_name,
        }
    }

    /// Global CPU load in `[0, 100]`; `0.0` when unreadable
    pub fn get_cpu_usage(&self) -> f32 {
        match self.host.lock().cpu_percent() {
            Ok(value) => clamp_percent(value),
            Err(e) => {
                log::debug!("CPU usage unavailable: {}", e);
                0.0
            }
        }
    }

    /// Physical memory in use, `[0, 100]`; `0.0` when unreadable
    pub fn get_ram_usage(&self) -> f32 {
        match self.host.lock().ram_percent() {
            Ok(value) => clamp_percent(value),
            Err(e) => {
                log::debug!("RAM usage unavailable: {}", e);
                0.0
            }
        }
    }

    pub fn get_cpu_temperature(&self) -> Option<f32> {
        first_available(
            &self.cpu_temp_sources,
            |source| (source.name(), source.cpu_temperature()),
            |temp| temp.is_finite(),
        )
    }

    /// GPU names with their current usage. Unknown usage is reported as `0.0`.
    pub fn get_gpu_info(&self) -> Vec<(String, f32)> {
        self.gpu_samples()
            .into_iter()
            .map(|gpu| (gpu.name, gpu.usage_percent.unwrap_or(0.0)))
            .collect()
    }

    /// Cached inventory joined with fresh readings from each contributing backend
    pub fn gpu_samples(&self) -> Vec<GpuSample> {
        self.joined_samples()
            .into_iter()
            .map(|(_, sample)| sample)
            .collect()
    }

    /// First non-empty set of GPU temperatures, backends tried in priority order
    pub fn get_gpu_temperature(&self) -> Option<Vec<f32>> {
        self.first_temperature_set(|_| true)
    }

    /// Descriptive processor name, computed once and memoized
    pub fn cpu_name(&self) -> String {
        let mut memo = self.cpu_name.lock();
        if let Some(name) = memo.as_ref() {
            return name.clone();
        }

        let name = self
            .host
            .lock()
            .cpu_brand()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .or_else(self.cpu_name_lookup)
            .unwrap_or_else(|| FALLBACK_CPU_NAME.to_string());

        log::debug!("CPU name resolved to {:?}", name);
        *memo = Some(name.clone());
        name
    }

    /// CPU manufacturer, from the vendor id or else the CPU name
    pub fn cpu_vendor(&self) -> Option<String> {
        let vendor_id = self.host.lock().cpu_vendor_id();
        vendor_id
            .as_deref()
            .and_then(platform::cpu::vendor_from_id)
            .or_else(|| platform::cpu::vendor_from_name(&self.cpu_name()))
            .map(str::to_string)
    }

    /// Local wall-clock time as `HH:MM:SS`
    pub fn current_time(&self) -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }

    /// Invalidate the CPU name and GPU inventory caches
    pub fn clear_cache(&self) {
        *self.cpu_name.lock() = None;
        self.inventory.lock().invalidate();
    }

    /// A full readout of every metric
    pub fn sample(&self) -> MetricSample {
        let gpus = self.gpu_samples_with_temps();

        let now = chrono::Local::now();
        MetricSample {
            timestamp: now.timestamp(),
            time: now.format("%H:%M:%S").to_string(),
            cpu_percent: self.get_cpu_usage(),
            ram_percent: self.get_ram_usage(),
            cpu_temp_celsius: self.get_cpu_temperature(),
            gpus,
        }
    }

    /// A readout limited to what `config` shows.
    ///
    /// Hidden metrics are not probed. Hidden GPUs are dropped.
    pub fn sample_for(&self, config: &OverlayConfig) -> MetricSample {
        let now = chrono::Local::now();
        let mut sample = MetricSample {
            timestamp: now.timestamp(),
            time: now.format("%H:%M:%S").to_string(),
            ..Default::default()
        };

        if config.show_cpu {
            sample.cpu_percent = self.get_cpu_usage();
        }
        if config.show_ram {
            sample.ram_percent = self.get_ram_usage();
        }
        if config.show_cpu_temp {
            sample.cpu_temp_celsius = self.get_cpu_temperature();
        }

        if config.show_gpu {
            // Temperatures are assigned over the full inventory before hidden GPUs are dropped
            let mut gpus = if config.show_gpu_temp {
                self.gpu_samples_with_temps()
            } else {
                self.gpu_samples()
            };
            gpus.retain(|gpu| config.is_gpu_visible(&gpu.name));

            if !config.show_gpu_temp {
                for gpu in &mut gpus {
                    gpu.temp_celsius = None;
                }
            }
            sample.gpus = gpus;
        }

        sample
    }

    /// Inventory entries paired with their readings, tagged with the backend
    /// index that produced each entry. Inventory order is kept.
    fn joined_samples(&self) -> Vec<(usize, GpuSample)> {
        let entries = self.current_inventory();
        let mut samples = Vec::with_capacity(entries.len());

        // Readings are fetched once per backend
        let mut bucket_samples: Vec<(usize, std::vec::IntoIter<GpuSample>)> = backend_order(&entries)
            .into_iter()
            .map(|index| {
                let devices: Vec<&GpuDevice> = entries
                    .iter()
                    .filter(|e| e.backend == index)
                    .map(|e| &e.device)
                    .collect();

                let readings = match self.gpu_backends.get(index) {
                    Some(backend) => backend.readings().unwrap_or_else(|e| {
                        log::debug!("{}: readings unavailable: {}", backend.name(), e);
                        Vec::new()
                    }),
                    None => Vec::new(),
                };

                (index, pair_bucket(&devices, &readings).into_iter())
            })
            .collect();

        for entry in &entries {
            if let Some((_, bucket)) = bucket_samples.iter_mut().find(|(i, _)| *i == entry.backend) {
                if let Some(sample) = bucket.next() {
                    samples.push((entry.backend, sample));
                }
            }
        }

        samples
    }

    /// [`gpu_samples`](Self::gpu_samples) plus temperatures for GPUs that only
    /// a name-only enumerator knows about
    fn gpu_samples_with_temps(&self) -> Vec<GpuSample> {
        let mut joined = self.joined_samples();
        self.backfill_enumerated_temps(&mut joined);
        joined.into_iter().map(|(_, sample)| sample).collect()
    }

    /// Give enumerated GPUs the temperatures of a backend that can read them.
    ///
    /// GPUs listed by a vendor backend keep whatever that backend reported.
    /// For enumerated GPUs, a vendor backend only feeds GPUs of its own
    /// vendor; when no vendor backend has readings, the generic sensor set is
    /// paired positionally over the enumerated list.
    fn backfill_enumerated_temps(&self, samples: &mut [(usize, GpuSample)]) {
        let mut enumerated: Vec<&mut GpuSample> = samples
            .iter_mut()
            .filter(|(index, _)| {
                self.gpu_backends
                    .get(*index)
                    .is_some_and(|backend| backend.vendor().is_none())
            })
            .map(|(_, sample)| sample)
            .collect();

        if enumerated.is_empty() || enumerated.iter().any(|gpu| gpu.temp_celsius.is_some()) {
            return;
        }

        let mut vendors: Vec<GpuVendor> = Vec::new();
        for gpu in &enumerated {
            if gpu.vendor != GpuVendor::Other && !vendors.contains(&gpu.vendor) {
                vendors.push(gpu.vendor);
            }
        }

        let mut filled = false;
        for vendor in vendors {
            let Some(temps) = self.first_temperature_set(|v| v == Some(vendor)) else {
                continue;
            };
            for (gpu, temp) in enumerated
                .iter_mut()
                .filter(|gpu| gpu.vendor == vendor)
                .zip(temps)
            {
                gpu.temp_celsius = Some(temp);
                filled = true;
            }
        }

        if filled {
            return;
        }

        if let Some(temps) = self.first_temperature_set(|v| v.is_none()) {
            for (gpu, temp) in enumerated.iter_mut().zip(temps) {
                gpu.temp_celsius = Some(temp);
            }
        }
    }

    /// First non-empty temperature set among backends whose vendor passes `accept_vendor`
    fn first_temperature_set<P>(&self, accept_vendor: P) -> Option<Vec<f32>>
    where
        P: Fn(Option<GpuVendor>) -> bool,
    {
        let candidates: Vec<&Box<dyn GpuBackend>> = self
            .gpu_backends
            .iter()
            .filter(|backend| accept_vendor(backend.vendor()))
            .collect();

        first_available(
            &candidates,
            |backend| {
                let temps = backend.readings().map(|readings| {
                    readings
                        .into_iter()
                        .filter_map(|r| r.temp_celsius)
                        .collect::<Vec<f32>>()
                });
                (backend.name(), temps)
            },
            |temps| !temps.is_empty(),
        )
    }

    /// Return the cached inventory, refreshing it first when stale
    fn current_inventory(&self) -> Vec<InventoryEntry> {
        let mut cache = self.inventory.lock();
        let now = Instant::now();

        if cache.is_stale(now, self.inventory_window) {
            let entries = self.probe_inventory();
            log::debug!("GPU inventory refreshed: {} device(s)", entries.len());
            *cache = InventoryCache::new(entries, now);
        }

        cache.entries.clone()
    }

    /// Run the expensive inventory probes.
    ///
    /// Per vendor, the first backend with a non-empty inventory wins and the
    /// vendors are merged. Generic enumerators only run if that found nothing.
    fn probe_inventory(&self) -> Vec<InventoryEntry> {
        let mut entries = Vec::new();
        let mut claimed = Vec::new();

        for (index, backend) in self.gpu_backends.iter().enumerate() {
            let Some(vendor) = backend.vendor() else {
                continue;
            };
            if claimed.contains(&vendor) {
                continue;
            }

            match backend.inventory() {
                Ok(devices) if !devices.is_empty() => {
                    claimed.push(vendor);
                    entries.extend(
                        devices
                            .into_iter()
                            .map(|device| InventoryEntry { device, backend: index }),
                    );
                }
                Ok(_) => log::debug!("{}: no GPUs reported", backend.name()),
                Err(e) => log::debug!("{}: inventory unavailable: {}", backend.name(), e),
            }
        }

        if !entries.is_empty() {
            return entries;
        }

        let generic: Vec<(usize, &Box<dyn GpuBackend>)> = self
            .gpu_backends
            .iter()
            .enumerate()
            .filter(|(_, b)| b.vendor().is_none())
            .collect();

        first_available(
            &generic,
            |(index, backend)| {
                let found = backend.inventory().map(|devices| {
                    devices
                        .into_iter()
                        .map(|device| InventoryEntry { device, backend: *index })
                        .collect::<Vec<_>>()
                });
                (backend.name(), found)
            },
            |found| !found.is_empty(),
        )
        .unwrap_or_default()
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

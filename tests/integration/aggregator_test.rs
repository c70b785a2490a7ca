use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use overlay_monitor::core::system_monitor::{CpuTempSource, HostStats};
use overlay_monitor::{
    GpuBackend, GpuDevice, GpuReading, GpuVendor, MetricsAggregator, MonitorError, OverlayConfig,
};

struct FakeHost {
    cpu: f32,
    ram: f32,
    brand: Option<String>,
    brand_calls: Arc<AtomicUsize>,
}

impl FakeHost {
    fn new(cpu: f32, ram: f32) -> Self {
        Self {
            cpu,
            ram,
            brand: Some("AMD Ryzen 7 5800X 8-Core Processor".to_string()),
            brand_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl HostStats for FakeHost {
    fn cpu_percent(&mut self) -> overlay_monitor::Result<f32> {
        Ok(self.cpu)
    }

    fn ram_percent(&mut self) -> overlay_monitor::Result<f32> {
        Ok(self.ram)
    }

    fn cpu_brand(&self) -> Option<String> {
        self.brand_calls.fetch_add(1, Ordering::SeqCst);
        self.brand.clone()
    }

    fn cpu_vendor_id(&self) -> Option<String> {
        Some("AuthenticAMD".to_string())
    }
}

struct BrokenHost;

impl HostStats for BrokenHost {
    fn cpu_percent(&mut self) -> overlay_monitor::Result<f32> {
        Err(MonitorError::no_data("no cpus"))
    }

    fn ram_percent(&mut self) -> overlay_monitor::Result<f32> {
        Err(MonitorError::no_data("no memory"))
    }

    fn cpu_brand(&self) -> Option<String> {
        None
    }

    fn cpu_vendor_id(&self) -> Option<String> {
        None
    }
}

/// Scripted GPU backend that counts inventory probes
struct FakeGpu {
    name: &'static str,
    vendor: Option<GpuVendor>,
    devices: Option<Vec<GpuDevice>>,
    readings: Option<Vec<GpuReading>>,
    inventory_calls: Arc<AtomicUsize>,
}

impl FakeGpu {
    fn new(name: &'static str, vendor: Option<GpuVendor>) -> Self {
        Self {
            name,
            vendor,
            devices: None,
            readings: None,
            inventory_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn devices(mut self, devices: Vec<GpuDevice>) -> Self {
        self.devices = Some(devices);
        self
    }

    fn readings(mut self, readings: Vec<GpuReading>) -> Self {
        self.readings = Some(readings);
        self
    }
}

impl GpuBackend for FakeGpu {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> Option<GpuVendor> {
        self.vendor
    }

    fn inventory(&self) -> overlay_monitor::Result<Vec<GpuDevice>> {
        self.inventory_calls.fetch_add(1, Ordering::SeqCst);
        self.devices
            .clone()
            .ok_or_else(|| MonitorError::tool_not_found(self.name))
    }

    fn readings(&self) -> overlay_monitor::Result<Vec<GpuReading>> {
        self.readings
            .clone()
            .ok_or_else(|| MonitorError::tool_not_found(self.name))
    }
}

struct FixedTemp(f32);

impl CpuTempSource for FixedTemp {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn cpu_temperature(&self) -> overlay_monitor::Result<f32> {
        Ok(self.0)
    }
}

struct MissingTemp;

impl CpuTempSource for MissingTemp {
    fn name(&self) -> &'static str {
        "missing"
    }

    fn cpu_temperature(&self) -> overlay_monitor::Result<f32> {
        Err(MonitorError::unsupported("no sensors"))
    }
}

fn no_lookup() -> Option<String> {
    None
}

fn reading(id: &str, usage: f32, temp: f32) -> GpuReading {
    GpuReading {
        id: Some(id.to_string()),
        usage_percent: Some(usage),
        temp_celsius: Some(temp),
    }
}

#[test]
fn test_cpu_and_ram_pass_through() {
    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(37.5, 61.25))).build();

    assert_eq!(aggregator.get_cpu_usage(), 37.5);
    assert_eq!(aggregator.get_ram_usage(), 61.25);
}

#[test]
fn test_cpu_and_ram_clamped() {
    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(104.0, -1.0))).build();

    assert_eq!(aggregator.get_cpu_usage(), 100.0);
    assert_eq!(aggregator.get_ram_usage(), 0.0);
}

#[test]
fn test_unreadable_host_reports_zero() {
    let aggregator = MetricsAggregator::builder(Box::new(BrokenHost))
        .cpu_name_lookup(no_lookup)
        .build();

    assert_eq!(aggregator.get_cpu_usage(), 0.0);
    assert_eq!(aggregator.get_ram_usage(), 0.0);
    assert_eq!(aggregator.cpu_name(), "CPU");
}

#[test]
fn test_gpu_info_pairs_by_id_across_vendors() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .devices(vec![GpuDevice::new("GPU-A", GpuVendor::Nvidia).with_id("uuid-a")])
        .readings(vec![reading("uuid-a", 42.0, 60.0)]);
    let amd = FakeGpu::new("rocm-smi", Some(GpuVendor::Amd))
        .devices(vec![GpuDevice::new("GPU-B", GpuVendor::Amd).with_id("card1")])
        .readings(vec![reading("card1", 7.5, 45.0)]);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(nvidia))
        .gpu_backend(Box::new(amd))
        .build();

    assert_eq!(
        aggregator.get_gpu_info(),
        vec![("GPU-A".to_string(), 42.0), ("GPU-B".to_string(), 7.5)]
    );
}

#[test]
fn test_readings_matched_by_id_not_position() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .devices(vec![
            GpuDevice::new("GPU-A", GpuVendor::Nvidia).with_id("uuid-a"),
            GpuDevice::new("GPU-B", GpuVendor::Nvidia).with_id("uuid-b"),
        ])
        .readings(vec![reading("uuid-b", 90.0, 70.0), reading("uuid-a", 10.0, 40.0)]);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(nvidia))
        .build();

    let samples = aggregator.gpu_samples();
    assert_eq!(samples[0].usage_percent, Some(10.0));
    assert_eq!(samples[1].usage_percent, Some(90.0));
}

#[test]
fn test_missing_tools_degrade_to_empty() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia));
    let lspci = FakeGpu::new("lspci", None);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(nvidia))
        .gpu_backend(Box::new(lspci))
        .cpu_temp_source(Box::new(MissingTemp))
        .build();

    assert!(aggregator.get_gpu_info().is_empty());
    assert_eq!(aggregator.get_gpu_temperature(), None);
    assert_eq!(aggregator.get_cpu_temperature(), None);
}

#[test]
fn test_gpu_without_readings_reports_zero_usage() {
    let lspci = FakeGpu::new("lspci", None)
        .devices(vec![GpuDevice::new("Intel UHD Graphics 630", GpuVendor::Intel)]);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(lspci))
        .build();

    assert_eq!(
        aggregator.get_gpu_info(),
        vec![("Intel UHD Graphics 630".to_string(), 0.0)]
    );
    assert_eq!(aggregator.gpu_samples()[0].usage_percent, None);
}

#[test]
fn test_malformed_reading_only_blanks_that_gpu() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .devices(vec![
            GpuDevice::new("GPU-A", GpuVendor::Nvidia).with_id("uuid-a"),
            GpuDevice::new("GPU-B", GpuVendor::Nvidia).with_id("uuid-b"),
        ])
        .readings(vec![
            GpuReading {
                id: Some("uuid-a".to_string()),
                usage_percent: None,
                temp_celsius: None,
            },
            reading("uuid-b", 55.0, 66.0),
        ]);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(nvidia))
        .build();

    assert_eq!(
        aggregator.get_gpu_info(),
        vec![("GPU-A".to_string(), 0.0), ("GPU-B".to_string(), 55.0)]
    );
    assert_eq!(aggregator.get_gpu_temperature(), Some(vec![66.0]));
}

#[test]
fn test_inventory_cached_within_window() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .devices(vec![GpuDevice::new("GPU-A", GpuVendor::Nvidia)])
        .readings(vec![GpuReading::usage(12.0)]);
    let calls = nvidia.inventory_calls.clone();

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(nvidia))
        .inventory_window(Duration::from_secs(3600))
        .build();

    aggregator.get_gpu_info();
    aggregator.get_gpu_info();
    aggregator.gpu_samples();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    aggregator.clear_cache();
    aggregator.get_gpu_info();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_inventory_reprobed_after_window() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .devices(vec![GpuDevice::new("GPU-A", GpuVendor::Nvidia)])
        .readings(vec![GpuReading::usage(12.0)]);
    let calls = nvidia.inventory_calls.clone();

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(nvidia))
        .inventory_window(Duration::from_millis(20))
        .build();

    aggregator.get_gpu_info();
    std::thread::sleep(Duration::from_millis(40));
    aggregator.get_gpu_info();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_generic_enumerator_skipped_when_vendor_found() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .devices(vec![GpuDevice::new("GPU-A", GpuVendor::Nvidia)])
        .readings(vec![GpuReading::usage(12.0)]);
    let lspci = FakeGpu::new("lspci", None)
        .devices(vec![GpuDevice::new("NVIDIA Corporation GA104", GpuVendor::Nvidia)]);
    let lspci_calls = lspci.inventory_calls.clone();

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(nvidia))
        .gpu_backend(Box::new(lspci))
        .build();

    assert_eq!(aggregator.get_gpu_info().len(), 1);
    assert_eq!(lspci_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cpu_temperature_first_source_wins() {
    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .cpu_temp_source(Box::new(MissingTemp))
        .cpu_temp_source(Box::new(FixedTemp(52.0)))
        .cpu_temp_source(Box::new(FixedTemp(99.0)))
        .build();

    assert_eq!(aggregator.get_cpu_temperature(), Some(52.0));
}

#[test]
fn test_cpu_name_memoized() {
    let host = FakeHost::new(0.0, 0.0);
    let calls = host.brand_calls.clone();
    let aggregator = MetricsAggregator::builder(Box::new(host)).build();

    assert_eq!(aggregator.cpu_name(), "AMD Ryzen 7 5800X 8-Core Processor");
    assert_eq!(aggregator.cpu_name(), "AMD Ryzen 7 5800X 8-Core Processor");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    aggregator.clear_cache();
    aggregator.cpu_name();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cpu_vendor_from_vendor_id() {
    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0))).build();
    assert_eq!(aggregator.cpu_vendor().as_deref(), Some("AMD"));
}

#[test]
fn test_current_time_format() {
    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0))).build();
    let time = aggregator.current_time();

    assert_eq!(time.len(), 8);
    assert_eq!(time.as_bytes()[2], b':');
    assert_eq!(time.as_bytes()[5], b':');
}

#[test]
fn test_sample_for_respects_visibility() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .devices(vec![
            GpuDevice::new("GPU-A", GpuVendor::Nvidia).with_id("uuid-a"),
            GpuDevice::new("GPU-B", GpuVendor::Nvidia).with_id("uuid-b"),
        ])
        .readings(vec![reading("uuid-a", 42.0, 60.0), reading("uuid-b", 7.5, 45.0)]);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(20.0, 30.0)))
        .gpu_backend(Box::new(nvidia))
        .cpu_temp_source(Box::new(FixedTemp(50.0)))
        .build();

    let mut config = OverlayConfig {
        show_ram: false,
        ..Default::default()
    };
    config.set_gpu_visible("GPU-B", false);

    let sample = aggregator.sample_for(&config);
    assert_eq!(sample.cpu_percent, 20.0);
    assert_eq!(sample.ram_percent, 0.0);
    assert_eq!(sample.cpu_temp_celsius, None);
    assert_eq!(sample.gpus.len(), 1);
    assert_eq!(sample.gpus[0].name, "GPU-A");
    assert_eq!(sample.gpus[0].temp_celsius, None);

    let full = aggregator.sample();
    assert_eq!(full.ram_percent, 30.0);
    assert_eq!(full.cpu_temp_celsius, Some(50.0));
    assert_eq!(full.gpus.len(), 2);
    assert_eq!(full.gpus[1].temp_celsius, Some(45.0));
}

#[test]
fn test_aggregator_shared_between_threads() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .devices(vec![GpuDevice::new("GPU-A", GpuVendor::Nvidia)])
        .readings(vec![GpuReading::usage(12.0)]);
    let calls = nvidia.inventory_calls.clone();

    let aggregator = Arc::new(
        MetricsAggregator::builder(Box::new(FakeHost::new(5.0, 5.0)))
            .gpu_backend(Box::new(nvidia))
            .inventory_window(Duration::from_secs(3600))
            .build(),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let aggregator = aggregator.clone();
            std::thread::spawn(move || aggregator.get_gpu_info())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![("GPU-A".to_string(), 12.0)]);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_gpu_info_pairs_positionally_per_vendor() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .devices(vec![GpuDevice::new("GPU-A", GpuVendor::Nvidia)])
        .readings(vec![GpuReading::usage(42.0)]);
    let amd = FakeGpu::new("rocm-smi", Some(GpuVendor::Amd))
        .devices(vec![GpuDevice::new("GPU-B", GpuVendor::Amd)])
        .readings(vec![GpuReading::usage(7.5)]);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(nvidia))
        .gpu_backend(Box::new(amd))
        .build();

    assert_eq!(
        aggregator.get_gpu_info(),
        vec![("GPU-A".to_string(), 42.0), ("GPU-B".to_string(), 7.5)]
    );
}

fn sensor_temps(temps: &[f32]) -> FakeGpu {
    FakeGpu::new("sensors", None)
        .readings(temps.iter().map(|t| GpuReading::temperature(*t)).collect())
}

#[test]
fn test_vendor_gpu_without_temperature_stays_absent() {
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .devices(vec![GpuDevice::new("GeForce RTX 3070", GpuVendor::Nvidia)])
        .readings(vec![GpuReading::usage(30.0)]);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(nvidia))
        .gpu_backend(Box::new(sensor_temps(&[48.0])))
        .build();

    let sample = aggregator.sample();
    assert_eq!(sample.gpus[0].usage_percent, Some(30.0));
    assert_eq!(sample.gpus[0].temp_celsius, None);

    let config = OverlayConfig {
        show_gpu_temp: true,
        ..Default::default()
    };
    assert_eq!(aggregator.sample_for(&config).gpus[0].temp_celsius, None);
}

#[test]
fn test_enumerated_gpus_take_sensor_temperatures_in_order() {
    let lspci = FakeGpu::new("lspci", None).devices(vec![
        GpuDevice::new("GPU-A", GpuVendor::Other),
        GpuDevice::new("GPU-B", GpuVendor::Other),
    ]);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(sensor_temps(&[40.0, 70.0])))
        .gpu_backend(Box::new(lspci))
        .build();

    let temps: Vec<(String, Option<f32>)> = aggregator
        .sample()
        .gpus
        .into_iter()
        .map(|gpu| (gpu.name, gpu.temp_celsius))
        .collect();
    assert_eq!(
        temps,
        vec![
            ("GPU-A".to_string(), Some(40.0)),
            ("GPU-B".to_string(), Some(70.0))
        ]
    );
}

#[test]
fn test_hidden_gpu_does_not_shift_temperatures() {
    let lspci = FakeGpu::new("lspci", None).devices(vec![
        GpuDevice::new("GPU-A", GpuVendor::Other),
        GpuDevice::new("GPU-B", GpuVendor::Other),
    ]);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(sensor_temps(&[40.0, 70.0])))
        .gpu_backend(Box::new(lspci))
        .build();

    let mut config = OverlayConfig {
        show_gpu_temp: true,
        ..Default::default()
    };
    config.set_gpu_visible("GPU-A", false);

    let sample = aggregator.sample_for(&config);
    assert_eq!(sample.gpus.len(), 1);
    assert_eq!(sample.gpus[0].name, "GPU-B");
    assert_eq!(sample.gpus[0].temp_celsius, Some(70.0));
}

#[test]
fn test_enumerated_gpu_temperatures_stay_within_vendor() {
    // nvidia-smi cannot list devices here but still reports a temperature
    let nvidia = FakeGpu::new("nvidia-smi", Some(GpuVendor::Nvidia))
        .readings(vec![GpuReading::temperature(65.0)]);
    let lspci = FakeGpu::new("lspci", None).devices(vec![
        GpuDevice::new("Intel Corporation UHD Graphics 630", GpuVendor::Intel),
        GpuDevice::new("NVIDIA Corporation GA104", GpuVendor::Nvidia),
    ]);

    let aggregator = MetricsAggregator::builder(Box::new(FakeHost::new(0.0, 0.0)))
        .gpu_backend(Box::new(nvidia))
        .gpu_backend(Box::new(sensor_temps(&[40.0])))
        .gpu_backend(Box::new(lspci))
        .build();

    let gpus = aggregator.sample().gpus;
    assert_eq!(gpus.len(), 2);
    assert_eq!(gpus[0].temp_celsius, None);
    assert_eq!(gpus[1].temp_celsius, Some(65.0));
}

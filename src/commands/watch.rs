//! Headless overlay: poll the aggregator and print one line per tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::{ColoredString, Colorize};

use crate::core::config::OverlayConfig;
use crate::core::system_monitor::{MetricSample, MetricsAggregator};

/// Execute the watch command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = OverlayConfig::load().context("Failed to load config")?;

    let interval = matches
        .get_one::<u64>("interval")
        .copied()
        .map(|ms| Duration::from_millis(ms.max(1)))
        .unwrap_or_else(|| config.update_interval());
    let count = matches.get_one::<u64>("count").copied();
    let json_output = matches.get_flag("json");

    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = stop.clone();
    ctrlc::set_handler(move || stop_clone.store(true, Ordering::Relaxed))
        .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let aggregator = MetricsAggregator::from_config(&config);
    let cpu_label = cpu_label(&aggregator, &config);

    // Prime the CPU counter so the first printed value is not a bogus 0%
    aggregator.get_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

    let mut ticks = 0u64;
    while !stop.load(Ordering::Relaxed) {
        let sample = aggregator.sample_for(&config);

        if json_output {
            println!("{}", serde_json::to_string(&sample)?);
        } else {
            println!("{}", format_sample(&sample, &config, &cpu_label));
        }

        ticks += 1;
        if count.is_some_and(|limit| ticks >= limit) {
            break;
        }
        std::thread::sleep(interval);
    }

    Ok(())
}

/// Label for the CPU field according to the name/manufacturer options
pub fn cpu_label(aggregator: &MetricsAggregator, config: &OverlayConfig) -> String {
    let mut label = if config.show_cpu_name {
        aggregator.cpu_name()
    } else {
        "CPU".to_string()
    };

    if config.show_cpu_manufacturer {
        if let Some(vendor) = aggregator.cpu_vendor() {
            if !label.contains(&vendor) {
                label = format!("{} {}", vendor, label);
            }
        }
    }
    label
}

/// Render a sample as a single overlay line
pub fn format_sample(sample: &MetricSample, config: &OverlayConfig, cpu_label: &str) -> String {
    let mut parts = Vec::new();

    if config.show_time {
        parts.push(format!("Time: {}", sample.time));
    }

    if config.show_cpu {
        let mut field = format!("{}: {}", cpu_label, colorize(sample.cpu_percent));
        if let Some(temp) = sample.cpu_temp_celsius {
            field.push_str(&format!(" {:.0}°C", temp));
        }
        parts.push(field);
    }

    if config.show_ram {
        parts.push(format!("RAM: {}", colorize(sample.ram_percent)));
    }

    let numbered = sample.gpus.len() > 1;
    for (index, gpu) in sample.gpus.iter().enumerate() {
        let mut label = if config.show_gpu_name {
            gpu.name.clone()
        } else if numbered {
            format!("GPU{}", index)
        } else {
            "GPU".to_string()
        };
        if config.show_gpu_manufacturer && !label.contains(gpu.vendor.label()) {
            label = format!("{} {}", gpu.vendor.label(), label);
        }

        let usage = match gpu.usage_percent {
            Some(value) => colorize(value).to_string(),
            None => "N/A".dimmed().to_string(),
        };
        let mut field = format!("{}: {}", label, usage);
        if let Some(temp) = gpu.temp_celsius {
            field.push_str(&format!(" {:.0}°C", temp));
        }
        parts.push(field);
    }

    parts.join(" | ")
}

fn colorize(percent: f32) -> ColoredString {
    let text = format!("{:.1}%", percent);
    if percent >= 85.0 {
        text.red()
    } else if percent >= 70.0 {
        text.yellow()
    } else {
        text.green()
    }
}

//! List detected GPUs, as the settings dialog would to build its checklist.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::config::OverlayConfig;
use crate::core::system_monitor::MetricsAggregator;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = OverlayConfig::load().context("Failed to load config")?;
    let aggregator = MetricsAggregator::from_config(&config);

    let gpus = aggregator.gpu_samples();
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&gpus)?);
        return Ok(());
    }

    if gpus.is_empty() {
        println!("{}", "No GPUs detected.".yellow());
        return Ok(());
    }

    for (index, gpu) in gpus.iter().enumerate() {
        let usage = gpu
            .usage_percent
            .map(|u| format!("{:.1}%", u))
            .unwrap_or_else(|| "N/A".to_string());
        let temp = gpu
            .temp_celsius
            .map(|t| format!("{:.0}°C", t))
            .unwrap_or_else(|| "N/A".to_string());
        let visibility = if config.is_gpu_visible(&gpu.name) {
            "visible".green()
        } else {
            "hidden".dimmed()
        };

        println!(
            "{} {} [{}] usage {} temp {} ({})",
            format!("#{}", index).bold(),
            gpu.name.cyan(),
            gpu.vendor.label(),
            usage,
            temp,
            visibility
        );
    }

    Ok(())
}

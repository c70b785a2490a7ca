use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::config::OverlayConfig;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("path", _)) => {
            println!("{}", OverlayConfig::config_path()?.display());
            Ok(())
        }
        Some(("set", sub_matches)) => set(sub_matches),
        Some(("show-gpu", sub_matches)) => set_gpu_visibility(sub_matches, true),
        Some(("hide-gpu", sub_matches)) => set_gpu_visibility(sub_matches, false),
        Some(("reset", _)) => {
            OverlayConfig::default().save()?;
            println!("{}", "Configuration reset to defaults".green());
            Ok(())
        }
        _ => {
            println!("Use 'overlay-monitor config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let config = OverlayConfig::load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn set(matches: &ArgMatches) -> Result<()> {
    let key = matches
        .get_one::<String>("key")
        .context("Key argument is required")?;
    let value = matches
        .get_one::<String>("value")
        .context("Value argument is required")?;

    let mut config = OverlayConfig::load()?;
    config.set_value(key, value)?;
    config.save()?;

    println!("{} {} = {}", "✓".green(), key.bold(), value);
    Ok(())
}

fn set_gpu_visibility(matches: &ArgMatches, visible: bool) -> Result<()> {
    let name = matches
        .get_one::<String>("name")
        .context("GPU name argument is required")?;

    let mut config = OverlayConfig::load()?;
    config.set_gpu_visible(name, visible);
    config.save()?;

    let state = if visible { "visible".green() } else { "hidden".dimmed() };
    println!("{} {} is now {}", "✓".green(), name.bold(), state);
    Ok(())
}

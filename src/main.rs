use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use overlay_monitor::commands;

fn main() -> Result<()> {
    overlay_monitor::init_logging();

    let matches = Command::new("overlay-monitor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Always-on-top style system metrics, sampled from the terminal")
        .subcommand(
            Command::new("watch")
                .about("Print a metrics line on every refresh tick")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Refresh interval in milliseconds (defaults to the configured value)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .value_name("COUNT")
                        .help("Stop after this many samples")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Emit one JSON object per sample")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("gpus")
                .about("List detected GPUs with their current readings")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect or change the overlay configuration (use 'overlay-monitor config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the current configuration"))
                .subcommand(Command::new("path").about("Print the configuration file path"))
                .subcommand(
                    Command::new("set")
                        .about("Set a configuration value")
                        .arg(
                            Arg::new("key")
                                .help("Configuration key, e.g. update_interval_ms or show_cpu_temp")
                                .required(true)
                                .index(1),
                        )
                        .arg(
                            Arg::new("value")
                                .help("New value (JSON literal: true, 500, ...)")
                                .required(true)
                                .index(2),
                        ),
                )
                .subcommand(
                    Command::new("show-gpu")
                        .about("Show a GPU in the overlay")
                        .arg(Arg::new("name").help("GPU name as listed by 'gpus'").required(true).index(1)),
                )
                .subcommand(
                    Command::new("hide-gpu")
                        .about("Hide a GPU from the overlay")
                        .arg(Arg::new("name").help("GPU name as listed by 'gpus'").required(true).index(1)),
                )
                .subcommand(Command::new("reset").about("Restore the default configuration")),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("watch", sub_matches)) => commands::watch(sub_matches)?,
        Some(("gpus", sub_matches)) => commands::gpus(sub_matches)?,
        Some(("config", sub_matches)) => commands::config::execute(sub_matches)?,
        _ => {
            println!("Welcome to overlay-monitor!");
            println!("Use 'overlay-monitor --help' for more information.");
        }
    }

    Ok(())
}

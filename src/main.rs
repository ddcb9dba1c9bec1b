use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

// Use modules from the library
use hostwatch::commands;
use hostwatch::core::config::Config;

fn main() -> Result<()> {
    let matches = Command::new("hostwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Periodic host-metrics collector with alerts and a process tree")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Configuration file (default: <config dir>/hostwatch/hostwatch.toml)")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("monitor")
                .about("Collect metrics every refresh interval and print them")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECS")
                        .help("Seconds between two cycles")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .value_name("N")
                        .help("Stop after N cycles")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print one JSON object per cycle")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("plugin")
                        .short('p')
                        .long("plugin")
                        .value_name("NAME")
                        .help("Only run these plugins (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("filter")
                        .short('f')
                        .long("filter")
                        .value_name("RE")
                        .help("Process filter: regex, or key:regex (name, cmdline, username, status, pid)"),
                )
                .arg(
                    Arg::new("tree")
                        .short('t')
                        .long("tree")
                        .help("Show processes as a tree")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("max")
                        .short('m')
                        .long("max")
                        .value_name("N")
                        .help("Maximum number of processes")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("sort")
                        .short('s')
                        .long("sort")
                        .value_name("KEY")
                        .help("auto, cpu_percent, memory_percent, username, cpu_times, io_counters or name"),
                ),
        )
        .subcommand(
            Command::new("plugins")
                .about("List plugins and whether they are enabled")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("browse")
                .about("Poll the configured remote servers")
                .arg(
                    Arg::new("once")
                        .long("once")
                        .help("Poll once and exit")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("events")
                .about("Run a few cycles and print the alert log")
                .arg(
                    Arg::new("cycles")
                        .short('n')
                        .long("cycles")
                        .value_name("N")
                        .help("Number of cycles to run (default: 3)")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("clean")
                        .long("clean")
                        .help("Drop finished non-critical alerts before printing")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    hostwatch::init_logging_with(matches.get_flag("debug"));

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match matches.subcommand() {
        Some(("monitor", sub_matches)) => commands::monitor(sub_matches, config)?,
        Some(("plugins", sub_matches)) => commands::plugins(sub_matches, config)?,
        Some(("browse", sub_matches)) => commands::browse(sub_matches, config)?,
        Some(("events", sub_matches)) => commands::events(sub_matches, config)?,
        _ => {
            println!("Use 'hostwatch --help' for more information.");
        }
    }

    Ok(())
}

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use colored::*;
use std::sync::atomic::Ordering;

use crate::core::config::Config;
use crate::core::processes::{flatten_tree, format_tree_indent, SortKey};
use crate::core::stats::{PluginSnapshot, Stats};
use crate::core::timer::duration_from_secs;
use crate::ui::{format_percent, format_process_row, format_size, process_header};

pub fn execute(matches: &ArgMatches, mut config: Config) -> Result<()> {
    if let Some(interval) = matches.get_one::<f64>("interval") {
        config.global.refresh = *interval;
    }
    if let Some(filter) = matches.get_one::<String>("filter") {
        config.processes.filter = Some(filter.clone());
    }
    if let Some(max) = matches.get_one::<usize>("max") {
        config.processes.max_processes = Some(*max);
    }
    if let Some(sort) = matches.get_one::<String>("sort") {
        if sort != "auto" {
            sort.parse::<SortKey>()
                .with_context(|| format!("Invalid sort key '{}'", sort))?;
        }
        config.processes.sort_key = sort.clone();
    }
    if matches.get_flag("tree") {
        config.processes.tree = true;
    }
    let json = matches.get_flag("json");
    let count = matches.get_one::<u64>("count").copied();

    let mut stats = Stats::new(&config);

    let only: Vec<&String> = matches
        .get_many::<String>("plugin")
        .map(|values| values.collect())
        .unwrap_or_default();
    if !only.is_empty() {
        let known = stats.get_all_plugins();
        if let Some(unknown) = only.iter().find(|name| !known.contains(&name.as_str())) {
            bail!("Unknown plugin '{}'. Known plugins: {}", unknown, known.join(", "));
        }
        for name in known {
            if !only.iter().any(|wanted| wanted.as_str() == name) {
                stats.disable_plugin(name)?;
            }
        }
    }

    let cancel = super::cancel_flag()?;
    let interval = duration_from_secs(config.global.refresh);

    loop {
        stats
            .update_all()
            .context("Failed to collect metrics")?;

        if json {
            println!("{}", serde_json::to_string(&stats.get_all())?);
        } else {
            print_summary(&stats);
        }

        if count.is_some_and(|count| stats.cycles() >= count) {
            break;
        }
        if cancel.load(Ordering::Relaxed) || !super::wait(interval, &cancel) {
            break;
        }
    }

    Ok(())
}

fn print_summary(stats: &Stats) {
    let system = stats.get_plugin("system").unwrap_or_default();
    let uptime = stats.get_plugin("uptime").unwrap_or_default();
    println!(
        "\n{} {} {}",
        text(&system, "hostname").bold().bright_cyan(),
        text(&system, "hr_name").dimmed(),
        format!("up {}", text(&uptime, "human")).dimmed()
    );

    let board = stats.board();
    let cpu = stats.get_plugin("cpu").unwrap_or_default();
    if let Some(total) = cpu.number("total") {
        let status = board.get("cpu_user").max(board.get("cpu_system"));
        println!("{:<8} {}", "CPU".bold(), format_percent(total, status));
    }

    let mem = stats.get_plugin("mem").unwrap_or_default();
    if let (Some(percent), Some(used), Some(total)) =
        (mem.number("percent"), mem.number("used"), mem.number("total"))
    {
        println!(
            "{:<8} {} ({} / {})",
            "MEM".bold(),
            format_percent(percent, board.get("mem")),
            format_size(used as u64),
            format_size(total as u64)
        );
    }

    let swap = stats.get_plugin("memswap").unwrap_or_default();
    if let Some(percent) = swap.number("percent") {
        println!("{:<8} {}", "SWAP".bold(), format_percent(percent, board.get("memswap")));
    }

    let load = stats.get_plugin("load").unwrap_or_default();
    if let (Some(min1), Some(min5), Some(min15)) =
        (load.number("min1"), load.number("min5"), load.number("min15"))
    {
        println!("{:<8} {:.2} {:.2} {:.2}", "LOAD".bold(), min1, min5, min15);
    }

    let fs = stats.get_plugin("fs").unwrap_or_default();
    for item in fs.as_list() {
        let mnt_point = item.get("mnt_point").and_then(|v| v.as_str()).unwrap_or("?");
        let percent = item.get("percent").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let status = board.get(&format!("fs_{}", mnt_point));
        println!("{:<8} {} {}", "FS".bold(), format_percent(percent, status), mnt_point);
    }

    print_processes(stats);

    let events = stats.events();
    if !events.is_empty() {
        println!("{} {}", "ALERTS".bold().red(), events.len());
    }
}

fn print_processes(stats: &Stats) {
    let collector = stats.processes();
    let count = collector.count();
    println!(
        "{} {} total, {} running, {} sleeping, {} threads, sorted by {}{}",
        "TASKS".bold(),
        count.total,
        count.running,
        count.sleeping,
        count.thread,
        collector.sort_key(),
        if collector.is_auto_sort() { " (auto)" } else { "" }
    );
    println!("{}", process_header().bold());

    match collector.tree() {
        Some(tree) => {
            let limit = collector.max_processes().unwrap_or(usize::MAX);
            for node in flatten_tree(tree).iter().take(limit) {
                println!("{}", format_process_row(&node.process, &format_tree_indent(node)));
            }
        }
        None => {
            for process in collector.processes() {
                println!("{}", format_process_row(process, ""));
            }
        }
    }
}

fn text(snapshot: &PluginSnapshot, field: &str) -> String {
    snapshot
        .get(field)
        .and_then(|v| v.as_str())
        .unwrap_or("?")
        .to_string()
}

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::config::Config;
use crate::core::stats::Stats;
use crate::core::timer::duration_from_secs;
use crate::ui::format_event;

pub fn execute(matches: &ArgMatches, config: Config) -> Result<()> {
    let cycles = matches.get_one::<u64>("cycles").copied().unwrap_or(3).max(1);
    let mut stats = Stats::new(&config);
    let cancel = super::cancel_flag()?;
    let interval = duration_from_secs(config.global.refresh);

    for cycle in 0..cycles {
        stats
            .update_all()
            .context("Failed to collect metrics")?;
        if cycle + 1 < cycles && !super::wait(interval, &cancel) {
            break;
        }
    }

    if matches.get_flag("clean") {
        stats.events_mut().clean(false);
    }

    let events = stats.events().get();
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("{}", "No warning or critical alert detected".green());
        return Ok(());
    }

    println!(
        "{} ({} of max {})",
        "ALERTS".bold().red(),
        events.len(),
        config.alerts.max_events
    );
    if let Some(latest) = events.first() {
        println!("{}", latest.global_msg.dimmed());
    }
    for event in &events {
        println!("  {}", format_event(event));
    }
    Ok(())
}

use anyhow::Result;
use clap::ArgMatches;
use colored::*;
use serde::Serialize;

use crate::core::config::Config;
use crate::core::stats::Stats;

#[derive(Serialize)]
struct PluginInfo {
    name: &'static str,
    enabled: bool,
    key: Option<&'static str>,
    fields: Vec<&'static str>,
}

pub fn execute(matches: &ArgMatches, config: Config) -> Result<()> {
    let stats = Stats::new(&config);

    let mut plugins = Vec::new();
    for name in stats.get_all_plugins() {
        plugins.push(PluginInfo {
            name,
            enabled: stats.is_enabled(name)?,
            key: stats.key(name)?,
            fields: stats.fields(name)?.iter().map(|f| f.name).collect(),
        });
    }

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
        return Ok(());
    }

    println!("{}", "PLUGINS".bold().bright_cyan());
    for plugin in &plugins {
        let state = if plugin.enabled {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        let key = plugin
            .key
            .map(|key| format!("key: {}", key))
            .unwrap_or_default();
        println!("  {:<14} {:<9} {}", plugin.name.bold(), state, key.dimmed());
    }
    Ok(())
}

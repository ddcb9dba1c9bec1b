use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::config::Config;
use crate::core::remote::ServerBrowser;
use crate::core::timer::duration_from_secs;
use crate::ui::format_server;

pub fn execute(matches: &ArgMatches, config: Config) -> Result<()> {
    if config.browser.servers.is_empty() {
        bail!("No servers configured. Add [[browser.servers]] entries to the config file");
    }

    let browser = ServerBrowser::new(&config.browser).context("Failed to start the server browser")?;
    let labels: Vec<String> = browser.columns().iter().map(|c| c.label()).collect();
    let once = matches.get_flag("once");
    let cancel = super::cancel_flag()?;
    let interval = duration_from_secs(config.global.refresh);

    loop {
        browser.update()?;

        println!(
            "\n{:<20} {:<8} {}",
            "SERVER".bold(),
            "STATUS".bold(),
            labels.join("  ").bold()
        );
        for server in browser.servers() {
            println!("{}", format_server(&server, &labels));
        }

        if once || !super::wait(interval, &cancel) {
            break;
        }
    }
    Ok(())
}

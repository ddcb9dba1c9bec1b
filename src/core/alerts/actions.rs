//! External commands triggered by threshold changes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io;
use std::process::Command;
use std::time::Duration;

use crate::core::timer::Timer;

use super::thresholds::Status;

static TEMPLATE_TAG: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").ok());

/// Executes one action command line.
pub trait ActionRunner: Send {
    fn run(&mut self, command: &str) -> io::Result<String>;
}

/// Spawns programs directly, without a shell. Steps separated by `&&` run in
/// order and stop at the first failure.
#[derive(Debug, Default)]
pub struct CommandRunner;

impl ActionRunner for CommandRunner {
    fn run(&mut self, command: &str) -> io::Result<String> {
        let mut output = String::new();
        for step in command.split("&&") {
            let mut parts = step.split_whitespace();
            let Some(program) = parts.next() else {
                continue;
            };
            let result = Command::new(program).args(parts).output()?;
            output.push_str(&String::from_utf8_lossy(&result.stdout));
            if !result.status.success() {
                return Err(io::Error::other(format!(
                    "{} exited with {}",
                    program, result.status
                )));
            }
        }
        Ok(output)
    }
}

/// Replace `{{field}}` tags with values from the plugin stats; unknown tags
/// become empty.
pub fn render_template(command: &str, stats: &Map<String, Value>) -> String {
    let Some(tag) = TEMPLATE_TAG.as_ref() else {
        return command.to_string();
    };
    tag.replace_all(command, |caps: &regex::Captures| match stats.get(&caps[1]) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
    .into_owned()
}

/// Remembers the last triggered status per stat so an unchanged status does
/// not fire its command again.
pub struct ActionDispatcher {
    status: HashMap<String, Status>,
    start_timer: Timer,
    runner: Box<dyn ActionRunner>,
}

impl ActionDispatcher {
    pub fn new(start_delay: Duration) -> Self {
        Self::with_runner(start_delay, Box::new(CommandRunner))
    }

    pub fn with_runner(start_delay: Duration, runner: Box<dyn ActionRunner>) -> Self {
        Self {
            status: HashMap::new(),
            start_timer: Timer::new(start_delay),
            runner,
        }
    }

    pub fn get(&self, stat_name: &str) -> Option<Status> {
        self.status.get(stat_name).copied()
    }

    /// Record a status without running anything
    pub fn set(&mut self, stat_name: &str, status: Status) {
        self.status.insert(stat_name.to_string(), status);
    }

    /// Run `command` unless the stat already triggered with this status (and
    /// `repeat` is off) or the startup delay is still running.
    pub fn run(
        &mut self,
        stat_name: &str,
        status: Status,
        command: &str,
        repeat: bool,
        stats: &Map<String, Value>,
    ) -> bool {
        if (self.get(stat_name) == Some(status) && !repeat) || !self.start_timer.expired() {
            return false;
        }

        let command = render_template(command, stats);
        log::info!("Action triggered for {} ({}): {}", stat_name, status, command);
        match self.runner.run(&command) {
            Ok(output) => log::debug!("Action result for {} ({}): {}", stat_name, status, output),
            Err(e) => log::error!("Action error for {} ({}): {}", stat_name, status, e),
        }

        self.set(stat_name, status);
        true
    }
}

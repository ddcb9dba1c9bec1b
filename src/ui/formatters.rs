use chrono::{Local, TimeZone};
use colored::*;
use humansize::{format_size as human_format_size, BINARY};

use crate::core::alerts::{AlertEntry, Status};
use crate::core::processes::ProcessRecord;
use crate::core::remote::{ServerState, ServerStatus};

/// Format a byte count in human-readable form (KiB, MiB, GiB)
pub fn format_size(size: u64) -> String {
    human_format_size(size, BINARY)
}

/// Format a per-second byte rate
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_size(bytes_per_sec.max(0.0).round() as u64))
}

/// Format an epoch timestamp in local time (YYYY-MM-DD HH:MM:SS)
pub fn format_timestamp(epoch: i64) -> String {
    match Local.timestamp_opt(epoch, 0).single() {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

/// Color a string by alert status
pub fn colorize_status(text: &str, status: Status) -> ColoredString {
    match status {
        Status::Ok => text.green(),
        Status::Careful => text.cyan(),
        Status::Warning => text.yellow(),
        Status::Critical => text.red().bold(),
    }
}

/// `42.0%`, colored when a status is known
pub fn format_percent(value: f64, status: Option<Status>) -> String {
    let text = format!("{:.1}%", value);
    match status {
        Some(status) => colorize_status(&text, status).to_string(),
        None => text,
    }
}

/// One process row: pid, cpu, mem, rss, threads, user, I/O, command.
/// Unreadable I/O counters print `?` rather than zero.
pub fn format_process_row(process: &ProcessRecord, indent: &str) -> String {
    let io = match &process.io_counters {
        Some(io) if io.available => format!(
            "{:>10} {:>10}",
            format_rate(io.read_rate),
            format_rate(io.write_rate)
        ),
        Some(_) => format!("{:>10} {:>10}", "?", "?"),
        None => format!("{:>10} {:>10}", "-", "-"),
    };
    let threads = process
        .num_threads
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:>7} {:>6.1} {:>6.1} {:>10} {:>4} {:<10} {} {}{}",
        process.pid,
        process.cpu_percent,
        process.memory_percent,
        format_size(process.memory_info.rss),
        threads,
        truncate(process.username.as_deref().unwrap_or("?"), 10),
        io,
        indent,
        process.command()
    )
}

pub fn process_header() -> String {
    format!(
        "{:>7} {:>6} {:>6} {:>10} {:>4} {:<10} {:>10} {:>10} {}",
        "PID", "CPU%", "MEM%", "RES", "THR", "USER", "R/s", "W/s", "COMMAND"
    )
}

/// One alert log line, newest first in the caller's order
pub fn format_event(event: &AlertEntry) -> String {
    let end = if event.is_ongoing() {
        "ongoing".to_string()
    } else {
        format_timestamp(event.end)
    };
    let mut line = format!(
        "{} ({}) {} {} (min {:.1} avg {:.1} max {:.1})",
        format_timestamp(event.begin),
        end,
        colorize_status(event.state.as_str(), event.state),
        event.event_type.bold(),
        event.min,
        event.avg,
        event.max
    );
    if !event.top.is_empty() {
        line.push_str(&format!(" top: {}", event.top.join(", ")));
    }
    line
}

pub fn format_server(server: &ServerState, labels: &[String]) -> String {
    let status = match server.status {
        ServerStatus::Online => server.status.as_str().green(),
        ServerStatus::Offline => server.status.as_str().red(),
        ServerStatus::Unknown => server.status.as_str().dimmed(),
    };
    let columns: Vec<String> = labels
        .iter()
        .map(|label| {
            server
                .columns
                .get(label)
                .cloned()
                .unwrap_or_else(|| "-".to_string())
        })
        .collect();
    format!(
        "{:<20} {:<8} {}",
        truncate(&format!("{}:{}", server.name, server.port), 20),
        status,
        columns.join("  ")
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('~');
    short
}

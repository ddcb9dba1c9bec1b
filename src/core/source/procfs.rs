//! Parsers for the Linux `/proc` files sysinfo does not expose.
//!
//! Parsing is kept separate from reading so the formats can be tested on
//! any platform.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use super::{CpuPercent, CpuTimes, DiskIoCounters, IoBytes};
use crate::error::{HostwatchError, Result};

/// Kernel clock ticks per second for `/proc/[pid]/stat` times
pub const USER_HZ: f64 = 100.0;

const SECTOR_SIZE: u64 = 512;

/// Jiffy counters of one `cpu` line of `/proc/stat`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTicks {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTicks {
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Percent breakdown of the interval between two samples
    pub fn percent_since(&self, previous: &CpuTicks) -> CpuPercent {
        let delta = self.total().saturating_sub(previous.total());
        if delta == 0 {
            return CpuPercent::default();
        }
        let pct = |now: u64, before: u64| now.saturating_sub(before) as f64 * 100.0 / delta as f64;
        let idle = pct(self.idle, previous.idle);
        let iowait = pct(self.iowait, previous.iowait);
        CpuPercent {
            total: (100.0 - idle - iowait).max(0.0),
            user: Some(pct(self.user, previous.user)),
            system: Some(pct(self.system, previous.system)),
            idle: Some(idle),
            nice: Some(pct(self.nice, previous.nice)),
            iowait: Some(iowait),
            irq: Some(pct(self.irq + self.softirq, previous.irq + previous.softirq)),
            steal: Some(pct(self.steal, previous.steal)),
        }
    }
}

/// Parse one `cpu`/`cpuN` line.
pub fn parse_cpu_line(line: &str) -> Option<CpuTicks> {
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("cpu") {
        return None;
    }
    let values: Vec<u64> = parts.map(|v| v.parse().unwrap_or(0)).collect();
    if values.len() < 4 {
        return None;
    }
    let at = |i: usize| values.get(i).copied().unwrap_or(0);
    Some(CpuTicks {
        user: at(0),
        nice: at(1),
        system: at(2),
        idle: at(3),
        iowait: at(4),
        irq: at(5),
        softirq: at(6),
        steal: at(7),
    })
}

/// Aggregate line plus one entry per core.
pub fn parse_proc_stat(content: &str) -> Option<(CpuTicks, Vec<CpuTicks>)> {
    let mut total = None;
    let mut cores = Vec::new();

    for line in content.lines() {
        if line.starts_with("cpu ") {
            total = parse_cpu_line(line);
        } else if line.starts_with("cpu") {
            if let Some(core) = parse_cpu_line(line) {
                cores.push(core);
            }
        }
    }

    total.map(|t| (t, cores))
}

/// Fields of `/proc/[pid]/stat` after the command name
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidStat {
    pub state: char,
    pub ppid: u32,
    pub utime: u64,
    pub stime: u64,
    pub nice: i32,
    pub num_threads: u32,
}

impl PidStat {
    pub fn cpu_times(&self) -> CpuTimes {
        CpuTimes {
            user: self.utime as f64 / USER_HZ,
            system: self.stime as f64 / USER_HZ,
        }
    }
}

/// The command name may contain spaces and parentheses, so fields are
/// counted from the last `)`.
pub fn parse_pid_stat(content: &str) -> Option<PidStat> {
    let rest = &content[content.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 18 {
        return None;
    }
    Some(PidStat {
        state: fields[0].chars().next()?,
        ppid: fields[1].parse().ok()?,
        utime: fields[11].parse().ok()?,
        stime: fields[12].parse().ok()?,
        nice: fields[16].parse().ok()?,
        num_threads: fields[17].parse().ok()?,
    })
}

/// `read_bytes`/`write_bytes` of `/proc/[pid]/io`
pub fn parse_pid_io(content: &str) -> Option<IoBytes> {
    let mut read = None;
    let mut write = None;
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "read_bytes" => read = value.trim().parse().ok(),
            "write_bytes" => write = value.trim().parse().ok(),
            _ => {}
        }
    }
    Some(IoBytes {
        read_bytes: read?,
        write_bytes: write?,
    })
}

/// Voluntary and involuntary context switches from `/proc/[pid]/status`
pub fn parse_ctx_switches(content: &str) -> (Option<u64>, Option<u64>) {
    let mut voluntary = None;
    let mut involuntary = None;
    for line in content.lines() {
        if let Some(v) = line.strip_prefix("voluntary_ctxt_switches:") {
            voluntary = v.trim().parse().ok();
        } else if let Some(v) = line.strip_prefix("nonvoluntary_ctxt_switches:") {
            involuntary = v.trim().parse().ok();
        }
    }
    (voluntary, involuntary)
}

/// Whole-disk counters from `/proc/diskstats`; loop and ram devices are skipped.
pub fn parse_diskstats(content: &str) -> Vec<DiskIoCounters> {
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 10 {
                return None;
            }
            let name = parts[2];
            if name.starts_with("loop") || name.starts_with("ram") {
                return None;
            }
            let num = |i: usize| parts[i].parse::<u64>().unwrap_or(0);
            Some(DiskIoCounters {
                disk_name: name.to_string(),
                read_count: num(3),
                read_bytes: num(5) * SECTOR_SIZE,
                write_count: num(7),
                write_bytes: num(9) * SECTOR_SIZE,
            })
        })
        .collect()
}

/// Socket inodes listed in a `/proc/net/{tcp,udp}[6]` table
pub fn parse_socket_inodes(content: &str) -> HashSet<u64> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(9)?.parse().ok())
        .collect()
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| classify(path, e))
}

fn classify(path: &Path, e: io::Error) -> HostwatchError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => HostwatchError::access_denied(path.display().to_string()),
        io::ErrorKind::NotFound => HostwatchError::not_found(path.display().to_string()),
        _ => HostwatchError::Io(e),
    }
}

pub fn read_cpu_ticks() -> Result<(CpuTicks, Vec<CpuTicks>)> {
    let content = read(Path::new("/proc/stat"))?;
    parse_proc_stat(&content).ok_or_else(|| HostwatchError::other("Invalid /proc/stat format"))
}

pub fn read_pid_stat(pid: u32) -> Result<PidStat> {
    let path = format!("/proc/{}/stat", pid);
    let content = read(Path::new(&path))?;
    parse_pid_stat(&content).ok_or_else(|| HostwatchError::other(format!("Invalid {}", path)))
}

pub fn read_pid_io(pid: u32) -> Result<IoBytes> {
    let path = format!("/proc/{}/io", pid);
    let content = read(Path::new(&path))?;
    parse_pid_io(&content).ok_or_else(|| HostwatchError::other(format!("Invalid {}", path)))
}

pub fn read_ctx_switches(pid: u32) -> Result<(Option<u64>, Option<u64>)> {
    let content = read(Path::new(&format!("/proc/{}/status", pid)))?;
    Ok(parse_ctx_switches(&content))
}

pub fn read_diskstats() -> Result<Vec<DiskIoCounters>> {
    let content = read(Path::new("/proc/diskstats"))?;
    Ok(parse_diskstats(&content))
}

pub fn read_pid_max() -> Option<u64> {
    fs::read_to_string("/proc/sys/kernel/pid_max")
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Open descriptors and the socket inodes among them
pub fn read_fds(pid: u32) -> Result<(u64, HashSet<u64>)> {
    let dir = format!("/proc/{}/fd", pid);
    let entries = fs::read_dir(&dir).map_err(|e| classify(Path::new(&dir), e))?;

    let mut count = 0;
    let mut sockets = HashSet::new();
    for entry in entries.flatten() {
        count += 1;
        if let Ok(target) = fs::read_link(entry.path()) {
            let target = target.to_string_lossy();
            if let Some(inode) = target
                .strip_prefix("socket:[")
                .and_then(|s| s.strip_suffix(']'))
                .and_then(|s| s.parse().ok())
            {
                sockets.insert(inode);
            }
        }
    }
    Ok((count, sockets))
}

/// TCP and UDP connections owned by the process
pub fn count_connections(pid: u32, sockets: &HashSet<u64>) -> (u64, u64) {
    let count = |tables: &[&str]| -> u64 {
        tables
            .iter()
            .filter_map(|t| fs::read_to_string(format!("/proc/{}/net/{}", pid, t)).ok())
            .map(|content| parse_socket_inodes(&content).intersection(sockets).count() as u64)
            .sum()
    };
    (count(&["tcp", "tcp6"]), count(&["udp", "udp6"]))
}

use serde::{Deserialize, Serialize};

use crate::core::source::CpuTimes;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub rss: u64,
    pub vms: u64,
}

/// Cumulative I/O bytes plus the per-second rate since the previous cycle.
///
/// `available == false` means the counters could not be read (permissions,
/// or the process is new this cycle); renderers show "?" instead of 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_rate: f64,
    pub write_rate: f64,
    pub available: bool,
}

impl IoCounters {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn total_rate(&self) -> f64 {
        self.read_rate + self.write_rate
    }
}

/// Extended-tier fields, only filled for the displayed processes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedStats {
    pub num_fds: Option<u64>,
    pub ctx_switches_voluntary: Option<u64>,
    pub ctx_switches_involuntary: Option<u64>,
    pub tcp: Option<u64>,
    pub udp: Option<u64>,
    pub cpu_min: f64,
    pub cpu_max: f64,
    pub cpu_mean: f64,
    pub memory_min: f64,
    pub memory_max: f64,
    pub memory_mean: f64,
}

/// One process as seen during one collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub ppid: Option<u32>,
    pub name: String,
    pub cmdline: Vec<String>,
    pub username: Option<String>,
    /// Single-letter state code
    pub status: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_info: MemoryInfo,
    /// `None` until the standard tier is fetched
    pub io_counters: Option<IoCounters>,
    pub nice: Option<i32>,
    pub num_threads: Option<u32>,
    pub cpu_times: Option<CpuTimes>,
    pub extended: Option<ExtendedStats>,
    /// Seconds since the previous collection
    pub time_since_update: f64,
}

impl ProcessRecord {
    pub fn has_standard(&self) -> bool {
        self.io_counters.is_some()
    }

    /// Command line joined with spaces, or the name when it is empty
    /// (kernel threads).
    pub fn command(&self) -> String {
        if self.cmdline.is_empty() {
            self.name.clone()
        } else {
            self.cmdline.join(" ")
        }
    }
}

/// Running min/max/mean of CPU and memory percent for one PID.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunningStats {
    count: u64,
    cpu_sum: f64,
    cpu_min: f64,
    cpu_max: f64,
    memory_sum: f64,
    memory_min: f64,
    memory_max: f64,
}

impl RunningStats {
    pub(crate) fn record(&mut self, cpu: f64, memory: f64) {
        if self.count == 0 {
            self.cpu_min = cpu;
            self.cpu_max = cpu;
            self.memory_min = memory;
            self.memory_max = memory;
        } else {
            self.cpu_min = self.cpu_min.min(cpu);
            self.cpu_max = self.cpu_max.max(cpu);
            self.memory_min = self.memory_min.min(memory);
            self.memory_max = self.memory_max.max(memory);
        }
        self.count += 1;
        self.cpu_sum += cpu;
        self.memory_sum += memory;
    }

    pub(crate) fn apply(&self, extended: &mut ExtendedStats) {
        if self.count == 0 {
            return;
        }
        extended.cpu_min = self.cpu_min;
        extended.cpu_max = self.cpu_max;
        extended.cpu_mean = self.cpu_sum / self.count as f64;
        extended.memory_min = self.memory_min;
        extended.memory_max = self.memory_max;
        extended.memory_mean = self.memory_sum / self.count as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_falls_back_to_name() {
        let mut record = ProcessRecord {
            name: "kworker/0:1".to_string(),
            ..Default::default()
        };
        assert_eq!(record.command(), "kworker/0:1");
        record.cmdline = vec!["python3".to_string(), "-m".to_string(), "http.server".to_string()];
        assert_eq!(record.command(), "python3 -m http.server");
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        stats.record(10.0, 1.0);
        stats.record(30.0, 3.0);
        stats.record(20.0, 2.0);
        let mut extended = ExtendedStats::default();
        stats.apply(&mut extended);
        assert_eq!(extended.cpu_min, 10.0);
        assert_eq!(extended.cpu_max, 30.0);
        assert_eq!(extended.cpu_mean, 20.0);
        assert_eq!(extended.memory_mean, 2.0);
    }
}

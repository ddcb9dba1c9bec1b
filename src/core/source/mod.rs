//! Point-in-time access to OS metrics.
//!
//! Plugins and the process collector never talk to the OS directly; they go
//! through a [`MetricSource`]. [`SystemSource`] is the live backend, tests
//! plug in fixed values.

pub mod procfs;
mod system;

pub use system::SystemSource;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Global CPU usage in percent. Breakdown fields are `None` where the
/// platform does not expose them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuPercent {
    pub total: f64,
    pub user: Option<f64>,
    pub system: Option<f64>,
    pub idle: Option<f64>,
    pub nice: Option<f64>,
    pub iowait: Option<f64>,
    pub irq: Option<f64>,
    pub steal: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreUsage {
    pub cpu_number: usize,
    pub total: f64,
    pub user: Option<f64>,
    pub system: Option<f64>,
    pub idle: Option<f64>,
    pub iowait: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub name: String,
    pub hz_current: Option<f64>,
    pub hz_max: Option<f64>,
    pub logical_cores: usize,
    pub physical_cores: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub min1: f64,
    pub min5: f64,
    pub min15: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryCounters {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapCounters {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FsUsage {
    pub device_name: String,
    pub mnt_point: String,
    pub fs_type: String,
    pub size: u64,
    pub used: u64,
    pub free: u64,
}

/// Cumulative disk counters since boot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskIoCounters {
    pub disk_name: String,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_count: u64,
    pub write_count: u64,
}

/// Cumulative interface counters since boot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkCounters {
    pub interface_name: String,
    pub bytes_recv: u64,
    pub bytes_sent: u64,
    pub packets_recv: u64,
    pub packets_sent: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub label: String,
    /// `None` when the sensor could not be read this cycle
    pub value: Option<f64>,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,
    pub platform: String,
    pub arch: String,
}

/// Mandatory-tier process fields, cheap enough to read for every process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProcess {
    pub pid: u32,
    pub ppid: Option<u32>,
    pub name: String,
    /// Single-letter state code (R, S, Z, T, I, D, ...)
    pub status: char,
    pub cpu_percent: f64,
    pub memory_rss: u64,
    pub memory_vms: u64,
    /// Known without a per-process read on some platforms only
    pub num_threads: Option<u32>,
    pub kernel_thread: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessTable {
    pub processes: Vec<RawProcess>,
    /// Physical memory, used to derive memory percent
    pub total_memory: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IoBytes {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Accumulated CPU time in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
}

/// Standard-tier process fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardCounters {
    pub nice: Option<i32>,
    pub num_threads: Option<u32>,
    /// `None` when the counters are not readable (permissions)
    pub io: Option<IoBytes>,
    pub cpu_times: Option<CpuTimes>,
}

/// Extended-tier process fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedCounters {
    pub num_fds: Option<u64>,
    pub ctx_switches_voluntary: Option<u64>,
    pub ctx_switches_involuntary: Option<u64>,
    pub tcp: Option<u64>,
    pub udp: Option<u64>,
}

/// OS metrics capability.
///
/// Every read is point-in-time. A read the platform cannot provide returns
/// [`HostwatchError::Unsupported`](crate::error::HostwatchError::Unsupported).
pub trait MetricSource: Send {
    fn cpu(&mut self) -> Result<CpuPercent>;

    fn per_cpu(&mut self) -> Result<Vec<CoreUsage>>;

    fn cpu_info(&mut self) -> Result<CpuInfo>;

    fn load_average(&mut self) -> Result<LoadAverage>;

    fn memory(&mut self) -> Result<MemoryCounters>;

    fn swap(&mut self) -> Result<SwapCounters>;

    fn file_systems(&mut self) -> Result<Vec<FsUsage>>;

    fn disk_io(&mut self) -> Result<Vec<DiskIoCounters>>;

    fn network(&mut self) -> Result<Vec<NetworkCounters>>;

    fn sensors(&mut self) -> Result<Vec<SensorReading>>;

    fn host(&mut self) -> Result<HostInfo>;

    /// Seconds since boot
    fn uptime(&mut self) -> Result<u64>;

    /// Refresh and enumerate the process table.
    fn processes(&mut self) -> Result<ProcessTable>;

    fn process_cmdline(&mut self, pid: u32) -> Option<Vec<String>>;

    fn process_username(&mut self, pid: u32) -> Option<String>;

    fn process_standard(&mut self, pid: u32) -> Result<StandardCounters>;

    fn process_extended(&mut self, pid: u32) -> Result<ExtendedCounters>;

    fn pid_max(&mut self) -> Option<u64> {
        None
    }
}

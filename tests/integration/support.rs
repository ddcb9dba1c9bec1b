// Scriptable metric source shared by the integration tests

use hostwatch::core::source::*;
use hostwatch::{HostwatchError, Result};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Proc {
    pub raw: RawProcess,
    pub cmdline: Vec<String>,
    pub username: Option<String>,
    pub io: Option<IoBytes>,
}

pub fn proc(pid: u32, ppid: Option<u32>, name: &str, cpu: f64, rss: u64) -> Proc {
    Proc {
        raw: RawProcess {
            pid,
            ppid,
            name: name.to_string(),
            status: 'S',
            cpu_percent: cpu,
            memory_rss: rss,
            memory_vms: rss,
            num_threads: Some(1),
            kernel_thread: false,
        },
        cmdline: vec![format!("/usr/bin/{}", name), "--serve".to_string()],
        username: Some("root".to_string()),
        io: Some(IoBytes::default()),
    }
}

#[derive(Debug, Default)]
pub struct Host {
    pub cpu: CpuPercent,
    pub load: LoadAverage,
    pub memory: MemoryCounters,
    pub swap: SwapCounters,
    pub file_systems: Vec<FsUsage>,
    pub network: Vec<NetworkCounters>,
    pub processes: Vec<Proc>,
    pub fail_processes: bool,
    pub cpu_reads: usize,
    pub username_reads: usize,
}

/// Cloneable handle; tests keep one clone to script the host between cycles.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub host: Arc<Mutex<Host>>,
}

impl StaticSource {
    pub fn new() -> Self {
        let source = Self::default();
        {
            let mut host = source.host.lock();
            host.memory = MemoryCounters {
                total: 8_000,
                available: 6_000,
                used: 2_000,
                free: 6_000,
            };
            host.processes = vec![
                proc(1, None, "init", 0.1, 80),
                proc(200, Some(1), "postgres", 35.0, 1_600),
                proc(201, Some(200), "postgres", 5.0, 400),
                proc(300, Some(1), "nginx", 12.0, 160),
            ];
        }
        source
    }

    pub fn boxed(&self) -> Box<dyn MetricSource> {
        Box::new(self.clone())
    }
}

impl MetricSource for StaticSource {
    fn cpu(&mut self) -> Result<CpuPercent> {
        let mut host = self.host.lock();
        host.cpu_reads += 1;
        Ok(host.cpu.clone())
    }

    fn per_cpu(&mut self) -> Result<Vec<CoreUsage>> {
        Ok(vec![CoreUsage {
            cpu_number: 0,
            total: self.host.lock().cpu.total,
            ..Default::default()
        }])
    }

    fn cpu_info(&mut self) -> Result<CpuInfo> {
        Ok(CpuInfo {
            name: "Test CPU".to_string(),
            hz_current: Some(1.2e9),
            hz_max: Some(3.4e9),
            logical_cores: 4,
            physical_cores: Some(2),
        })
    }

    fn load_average(&mut self) -> Result<LoadAverage> {
        Ok(self.host.lock().load)
    }

    fn memory(&mut self) -> Result<MemoryCounters> {
        Ok(self.host.lock().memory)
    }

    fn swap(&mut self) -> Result<SwapCounters> {
        Ok(self.host.lock().swap)
    }

    fn file_systems(&mut self) -> Result<Vec<FsUsage>> {
        Ok(self.host.lock().file_systems.clone())
    }

    fn disk_io(&mut self) -> Result<Vec<DiskIoCounters>> {
        Err(HostwatchError::unsupported("disk I/O counters"))
    }

    fn network(&mut self) -> Result<Vec<NetworkCounters>> {
        Ok(self.host.lock().network.clone())
    }

    fn sensors(&mut self) -> Result<Vec<SensorReading>> {
        Err(HostwatchError::unsupported("sensors"))
    }

    fn host(&mut self) -> Result<HostInfo> {
        Ok(HostInfo {
            hostname: "db-1".to_string(),
            os_name: "Linux".to_string(),
            arch: "x86_64".to_string(),
            ..Default::default()
        })
    }

    fn uptime(&mut self) -> Result<u64> {
        Ok(90_061)
    }

    fn processes(&mut self) -> Result<ProcessTable> {
        let host = self.host.lock();
        if host.fail_processes {
            return Err(HostwatchError::process_enumeration("permission denied"));
        }
        Ok(ProcessTable {
            processes: host.processes.iter().map(|p| p.raw.clone()).collect(),
            total_memory: host.memory.total,
        })
    }

    fn process_cmdline(&mut self, pid: u32) -> Option<Vec<String>> {
        let host = self.host.lock();
        host.processes
            .iter()
            .find(|p| p.raw.pid == pid)
            .map(|p| p.cmdline.clone())
    }

    fn process_username(&mut self, pid: u32) -> Option<String> {
        let mut host = self.host.lock();
        host.username_reads += 1;
        host.processes
            .iter()
            .find(|p| p.raw.pid == pid)
            .and_then(|p| p.username.clone())
    }

    fn process_standard(&mut self, pid: u32) -> Result<StandardCounters> {
        let host = self.host.lock();
        let process = host
            .processes
            .iter()
            .find(|p| p.raw.pid == pid)
            .ok_or_else(|| HostwatchError::not_found(format!("pid {}", pid)))?;
        Ok(StandardCounters {
            nice: Some(0),
            num_threads: Some(2),
            io: process.io,
            cpu_times: Some(CpuTimes {
                user: process.raw.cpu_percent,
                system: 1.0,
            }),
        })
    }

    fn process_extended(&mut self, pid: u32) -> Result<ExtendedCounters> {
        Err(HostwatchError::access_denied(format!("pid {}", pid)))
    }
}

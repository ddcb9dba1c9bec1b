use sysinfo::{
    Components, CpuRefreshKind, Disks, MemoryRefreshKind, Networks, Pid, ProcessRefreshKind,
    ProcessStatus, ProcessesToUpdate, RefreshKind, System, ThreadKind, UpdateKind, Users,
};

use super::*;
use crate::error::HostwatchError;

#[cfg(target_os = "linux")]
use super::procfs::{self, CpuTicks};

/// Live metric source backed by sysinfo, with `/proc` reads on Linux for the
/// counters sysinfo does not expose.
pub struct SystemSource {
    system: System,
    components: Components,
    disks: Disks,
    networks: Networks,
    users: Users,
    #[cfg(target_os = "linux")]
    last_total_ticks: Option<CpuTicks>,
    #[cfg(target_os = "linux")]
    last_core_ticks: Vec<CpuTicks>,
}

impl SystemSource {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());

        Self {
            system: System::new_with_specifics(refresh_kind),
            components: Components::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            users: Users::new_with_refreshed_list(),
            #[cfg(target_os = "linux")]
            last_total_ticks: None,
            #[cfg(target_os = "linux")]
            last_core_ticks: Vec::new(),
        }
    }

    fn process(&self, pid: u32) -> Option<&sysinfo::Process> {
        self.system.process(Pid::from_u32(pid))
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

fn status_code(status: ProcessStatus) -> char {
    match status {
        ProcessStatus::Run => 'R',
        ProcessStatus::Sleep => 'S',
        ProcessStatus::Zombie => 'Z',
        ProcessStatus::Idle => 'I',
        ProcessStatus::Stop => 'T',
        ProcessStatus::UninterruptibleDiskSleep => 'D',
        ProcessStatus::Dead => 'X',
        _ => '?',
    }
}

impl MetricSource for SystemSource {
    #[cfg(target_os = "linux")]
    fn cpu(&mut self) -> Result<CpuPercent> {
        let (total, _) = procfs::read_cpu_ticks()?;
        let previous = self.last_total_ticks.unwrap_or_default();
        self.last_total_ticks = Some(total);
        Ok(total.percent_since(&previous))
    }

    #[cfg(not(target_os = "linux"))]
    fn cpu(&mut self) -> Result<CpuPercent> {
        self.system.refresh_cpu_usage();
        Ok(CpuPercent {
            total: self.system.global_cpu_usage() as f64,
            ..Default::default()
        })
    }

    #[cfg(target_os = "linux")]
    fn per_cpu(&mut self) -> Result<Vec<CoreUsage>> {
        let (_, cores) = procfs::read_cpu_ticks()?;
        let usage = cores
            .iter()
            .enumerate()
            .map(|(i, ticks)| {
                let previous = self.last_core_ticks.get(i).copied().unwrap_or_default();
                let pct = ticks.percent_since(&previous);
                CoreUsage {
                    cpu_number: i,
                    total: pct.total,
                    user: pct.user,
                    system: pct.system,
                    idle: pct.idle,
                    iowait: pct.iowait,
                }
            })
            .collect();
        self.last_core_ticks = cores;
        Ok(usage)
    }

    #[cfg(not(target_os = "linux"))]
    fn per_cpu(&mut self) -> Result<Vec<CoreUsage>> {
        self.system.refresh_cpu_usage();
        Ok(self
            .system
            .cpus()
            .iter()
            .enumerate()
            .map(|(i, cpu)| CoreUsage {
                cpu_number: i,
                total: cpu.cpu_usage() as f64,
                ..Default::default()
            })
            .collect())
    }

    fn cpu_info(&mut self) -> Result<CpuInfo> {
        self.system.refresh_cpu_frequency();
        let cpus = self.system.cpus();
        let first = cpus
            .first()
            .ok_or_else(|| HostwatchError::unsupported("CPU information"))?;

        Ok(CpuInfo {
            name: first.brand().trim().to_string(),
            hz_current: Some(first.frequency() as f64 * 1_000_000.0).filter(|hz| *hz > 0.0),
            hz_max: None,
            logical_cores: cpus.len(),
            physical_cores: System::physical_core_count(),
        })
    }

    #[cfg(not(target_os = "windows"))]
    fn load_average(&mut self) -> Result<LoadAverage> {
        let load = System::load_average();
        Ok(LoadAverage {
            min1: load.one,
            min5: load.five,
            min15: load.fifteen,
        })
    }

    #[cfg(target_os = "windows")]
    fn load_average(&mut self) -> Result<LoadAverage> {
        Err(HostwatchError::unsupported("load average"))
    }

    fn memory(&mut self) -> Result<MemoryCounters> {
        self.system.refresh_memory();
        Ok(MemoryCounters {
            total: self.system.total_memory(),
            available: self.system.available_memory(),
            used: self.system.used_memory(),
            free: self.system.free_memory(),
        })
    }

    fn swap(&mut self) -> Result<SwapCounters> {
        self.system.refresh_memory();
        Ok(SwapCounters {
            total: self.system.total_swap(),
            used: self.system.used_swap(),
            free: self.system.free_swap(),
        })
    }

    fn file_systems(&mut self) -> Result<Vec<FsUsage>> {
        self.disks.refresh(true);
        Ok(self
            .disks
            .iter()
            .map(|disk| {
                let size = disk.total_space();
                let free = disk.available_space();
                FsUsage {
                    device_name: disk.name().to_string_lossy().to_string(),
                    mnt_point: disk.mount_point().to_string_lossy().to_string(),
                    fs_type: disk.file_system().to_string_lossy().to_string(),
                    size,
                    used: size.saturating_sub(free),
                    free,
                }
            })
            .collect())
    }

    #[cfg(target_os = "linux")]
    fn disk_io(&mut self) -> Result<Vec<DiskIoCounters>> {
        procfs::read_diskstats()
    }

    #[cfg(not(target_os = "linux"))]
    fn disk_io(&mut self) -> Result<Vec<DiskIoCounters>> {
        Err(HostwatchError::unsupported("disk I/O counters"))
    }

    fn network(&mut self) -> Result<Vec<NetworkCounters>> {
        self.networks.refresh(true);
        Ok(self
            .networks
            .iter()
            .map(|(name, data)| NetworkCounters {
                interface_name: name.to_string(),
                bytes_recv: data.total_received(),
                bytes_sent: data.total_transmitted(),
                packets_recv: data.total_packets_received(),
                packets_sent: data.total_packets_transmitted(),
                errors_in: data.total_errors_on_received(),
                errors_out: data.total_errors_on_transmitted(),
            })
            .collect())
    }

    fn sensors(&mut self) -> Result<Vec<SensorReading>> {
        self.components.refresh(true);
        Ok(self
            .components
            .iter()
            .map(|comp| SensorReading {
                label: comp.label().to_string(),
                value: comp.temperature().map(f64::from),
                warning: comp.max().map(f64::from),
                critical: comp.critical().map(f64::from),
                unit: "C".to_string(),
            })
            .collect())
    }

    fn host(&mut self) -> Result<HostInfo> {
        Ok(HostInfo {
            hostname: System::host_name().unwrap_or_default(),
            os_name: System::name().unwrap_or_default(),
            os_version: System::os_version().unwrap_or_default(),
            kernel_version: System::kernel_version().unwrap_or_default(),
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        })
    }

    fn uptime(&mut self) -> Result<u64> {
        Ok(System::uptime())
    }

    fn processes(&mut self) -> Result<ProcessTable> {
        self.system.refresh_memory();
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_disk_usage()
                .with_tasks()
                .with_cmd(UpdateKind::OnlyIfNotSet)
                .with_user(UpdateKind::OnlyIfNotSet),
        );

        let processes: Vec<RawProcess> = self
            .system
            .processes()
            .values()
            .filter(|p| !matches!(p.thread_kind(), Some(ThreadKind::Userland)))
            .map(|p| RawProcess {
                pid: p.pid().as_u32(),
                ppid: p.parent().map(|pid| pid.as_u32()),
                name: p.name().to_string_lossy().to_string(),
                status: status_code(p.status()),
                cpu_percent: p.cpu_usage() as f64,
                memory_rss: p.memory(),
                memory_vms: p.virtual_memory(),
                num_threads: p.tasks().map(|tasks| tasks.len().max(1) as u32),
                kernel_thread: matches!(p.thread_kind(), Some(ThreadKind::Kernel)),
            })
            .collect();

        if processes.is_empty() {
            return Err(HostwatchError::process_enumeration(
                "no process visible to the current user",
            ));
        }

        Ok(ProcessTable {
            processes,
            total_memory: self.system.total_memory(),
        })
    }

    fn process_cmdline(&mut self, pid: u32) -> Option<Vec<String>> {
        self.process(pid).map(|p| {
            p.cmd()
                .iter()
                .map(|s| s.to_string_lossy().to_string())
                .collect()
        })
    }

    fn process_username(&mut self, pid: u32) -> Option<String> {
        let uid = self.process(pid)?.user_id()?;
        self.users
            .get_user_by_id(uid)
            .map(|user| user.name().to_string())
    }

    #[cfg(target_os = "linux")]
    fn process_standard(&mut self, pid: u32) -> Result<StandardCounters> {
        let stat = procfs::read_pid_stat(pid)?;
        let io = match procfs::read_pid_io(pid) {
            Ok(io) => Some(io),
            Err(e) if e.is_transient() => None,
            Err(e) => return Err(e),
        };
        Ok(StandardCounters {
            nice: Some(stat.nice),
            num_threads: Some(stat.num_threads),
            io,
            cpu_times: Some(stat.cpu_times()),
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn process_standard(&mut self, pid: u32) -> Result<StandardCounters> {
        let process = self
            .process(pid)
            .ok_or_else(|| HostwatchError::not_found(format!("pid {}", pid)))?;
        let usage = process.disk_usage();
        Ok(StandardCounters {
            nice: None,
            num_threads: None,
            io: Some(IoBytes {
                read_bytes: usage.total_read_bytes,
                write_bytes: usage.total_written_bytes,
            }),
            cpu_times: None,
        })
    }

    #[cfg(target_os = "linux")]
    fn process_extended(&mut self, pid: u32) -> Result<ExtendedCounters> {
        let (ctx_voluntary, ctx_involuntary) = procfs::read_ctx_switches(pid)?;
        let mut extended = ExtendedCounters {
            ctx_switches_voluntary: ctx_voluntary,
            ctx_switches_involuntary: ctx_involuntary,
            ..Default::default()
        };
        match procfs::read_fds(pid) {
            Ok((count, sockets)) => {
                let (tcp, udp) = procfs::count_connections(pid, &sockets);
                extended.num_fds = Some(count);
                extended.tcp = Some(tcp);
                extended.udp = Some(udp);
            }
            Err(e) if e.is_transient() => {}
            Err(e) => return Err(e),
        }
        Ok(extended)
    }

    #[cfg(not(target_os = "linux"))]
    fn process_extended(&mut self, _pid: u32) -> Result<ExtendedCounters> {
        Err(HostwatchError::unsupported("extended process counters"))
    }

    #[cfg(target_os = "linux")]
    fn pid_max(&mut self) -> Option<u64> {
        procfs::read_pid_max()
    }
}

//! Process table acquisition.
//!
//! Every cycle the collector reads the cheap fields of every process, applies
//! the filter, sorts, and only then reads the expensive fields for the
//! processes that will actually be shown.

pub mod filter;
pub mod programs;
mod record;
pub mod sort;
pub mod tree;

pub use filter::{FilterList, ProcessFilter};
pub use programs::{processes_to_programs, ProgramRecord};
pub use record::{ExtendedStats, IoCounters, MemoryInfo, ProcessRecord};
pub use sort::{parse_sort_mode, sort_processes, SortKey};
pub use tree::{build_process_tree, flatten_tree, format_tree_indent, FlattenedProcess, ProcessTreeNode};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::core::config::ProcessConfig;
use crate::core::source::{IoBytes, MetricSource};
use crate::core::timer::{duration_from_secs, Timer, UpdateClock};
use crate::error::Result;

use record::RunningStats;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessCount {
    pub total: usize,
    pub running: usize,
    pub sleeping: usize,
    pub thread: u64,
    pub pid_max: Option<u64>,
}

impl ProcessCount {
    fn from_records(records: &[ProcessRecord], pid_max: Option<u64>) -> Self {
        Self {
            total: records.len(),
            running: records.iter().filter(|p| p.status == "R").count(),
            sleeping: records.iter().filter(|p| p.status == "S").count(),
            thread: records
                .iter()
                .filter_map(|p| p.num_threads)
                .map(u64::from)
                .sum(),
            pid_max,
        }
    }
}

/// Highest CPU and memory percent among the filtered processes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaxValues {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// OS idle and kernel-accounting placeholders that are not real processes
fn is_idle_placeholder(name: &str) -> bool {
    let bsd = cfg!(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ));
    (bsd && name == "idle")
        || (cfg!(target_os = "windows") && name == "System Idle Process")
        || (cfg!(target_os = "macos") && name == "kernel_task")
}

pub struct ProcessCollector {
    filter: Option<ProcessFilter>,
    export_filter: FilterList,
    max_processes: Option<usize>,
    /// `None` follows the alert log hint
    sort_mode: Option<SortKey>,
    auto_key: SortKey,
    tree_enabled: bool,
    extended_enabled: bool,
    disable_kernel_threads: bool,

    cache_timer: Timer,
    cmdline_cache: HashMap<u32, Vec<String>>,
    username_cache: HashMap<u32, Option<String>>,
    io_old: HashMap<u32, (IoBytes, Instant)>,
    running_stats: HashMap<u32, RunningStats>,
    clock: UpdateClock,
    initialized: bool,

    filtered: Vec<ProcessRecord>,
    visible: usize,
    export: Vec<ProcessRecord>,
    count: ProcessCount,
    max_values: MaxValues,
    tree: Option<ProcessTreeNode>,
    degraded: bool,
}

impl ProcessCollector {
    pub fn new(config: &ProcessConfig) -> Self {
        let sort_mode = parse_sort_mode(&config.sort_key).unwrap_or_else(|e| {
            log::warn!("{}, sorting automatically", e);
            None
        });

        let mut collector = Self {
            filter: None,
            export_filter: FilterList::new(config.export_filter.as_deref()),
            max_processes: config.max_processes,
            sort_mode,
            auto_key: SortKey::CpuPercent,
            tree_enabled: config.tree,
            extended_enabled: config.extended,
            disable_kernel_threads: config.disable_kernel_threads,
            cache_timer: Timer::new(duration_from_secs(config.cache_timeout)),
            cmdline_cache: HashMap::new(),
            username_cache: HashMap::new(),
            io_old: HashMap::new(),
            running_stats: HashMap::new(),
            clock: UpdateClock::new(),
            initialized: false,
            filtered: Vec::new(),
            visible: 0,
            export: Vec::new(),
            count: ProcessCount::default(),
            max_values: MaxValues::default(),
            tree: None,
            degraded: false,
        };
        collector.set_filter(config.filter.as_deref());
        collector
    }

    /// Set the display filter. An invalid pattern disables filtering.
    pub fn set_filter(&mut self, input: Option<&str>) {
        self.filter = match input.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(input) => match ProcessFilter::parse(input) {
                Ok(filter) => {
                    log::debug!("Process filter set to {}", input);
                    Some(filter)
                }
                Err(e) => {
                    log::warn!("Cannot compile process filter, showing all processes: {}", e);
                    None
                }
            },
        };
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_ref().map(|f| f.input())
    }

    pub fn set_export_filter(&mut self, input: Option<&str>) {
        self.export_filter = FilterList::new(input);
    }

    pub fn set_max_processes(&mut self, max: Option<usize>) {
        self.max_processes = max;
    }

    pub fn max_processes(&self) -> Option<usize> {
        self.max_processes
    }

    /// `None` switches to automatic sorting
    pub fn set_sort_key(&mut self, key: Option<SortKey>) {
        self.sort_mode = key;
    }

    pub fn is_auto_sort(&self) -> bool {
        self.sort_mode.is_none()
    }

    /// Key used when sorting automatically
    pub fn set_auto_sort_key(&mut self, key: SortKey) {
        if self.is_auto_sort() && key != self.auto_key {
            log::debug!("Automatic process sort switched to {}", key);
        }
        self.auto_key = key;
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_mode.unwrap_or(self.auto_key)
    }

    pub fn set_tree(&mut self, enabled: bool) {
        self.tree_enabled = enabled;
    }

    pub fn set_extended(&mut self, enabled: bool) {
        self.extended_enabled = enabled;
    }

    pub fn update(&mut self, source: &mut dyn MetricSource) -> Result<()> {
        self.update_at(source, Instant::now())
    }

    /// Run one collection cycle as of `now`.
    ///
    /// An enumeration failure is returned on the first cycle only; later
    /// failures keep the previous lists.
    pub fn update_at(&mut self, source: &mut dyn MetricSource, now: Instant) -> Result<()> {
        let elapsed = self.clock.tick_at(now);

        if self.cache_timer.expired() {
            log::debug!(
                "Flushing process caches ({} command lines, {} usernames)",
                self.cmdline_cache.len(),
                self.username_cache.len()
            );
            self.cmdline_cache.clear();
            self.username_cache.clear();
            self.cache_timer.rearm();
        }

        let table = match source.processes() {
            Ok(table) => table,
            Err(e) if !self.initialized => return Err(e),
            Err(e) => {
                log::warn!("Cannot list processes, keeping the previous list: {}", e);
                return Ok(());
            }
        };
        self.initialized = true;

        let total_memory = table.total_memory;
        let mut all = Vec::with_capacity(table.processes.len());
        for raw in table.processes {
            if is_idle_placeholder(&raw.name) || (self.disable_kernel_threads && raw.kernel_thread)
            {
                continue;
            }
            let pid = raw.pid;
            let cmdline = self
                .cmdline_cache
                .entry(pid)
                .or_insert_with(|| source.process_cmdline(pid).unwrap_or_default())
                .clone();
            let username = self
                .username_cache
                .entry(pid)
                .or_insert_with(|| source.process_username(pid))
                .clone();
            let memory_percent = if total_memory > 0 {
                raw.memory_rss as f64 * 100.0 / total_memory as f64
            } else {
                0.0
            };

            all.push(ProcessRecord {
                pid,
                ppid: raw.ppid,
                name: raw.name,
                cmdline,
                username,
                status: raw.status.to_string(),
                cpu_percent: raw.cpu_percent,
                memory_percent,
                memory_info: MemoryInfo {
                    rss: raw.memory_rss,
                    vms: raw.memory_vms,
                },
                num_threads: raw.num_threads,
                time_since_update: elapsed,
                ..Default::default()
            });
        }

        let live: HashSet<u32> = all.iter().map(|p| p.pid).collect();
        self.cmdline_cache.retain(|pid, _| live.contains(pid));
        self.username_cache.retain(|pid, _| live.contains(pid));

        self.count = ProcessCount::from_records(&all, source.pid_max());
        self.export = if self.export_filter.is_active() {
            self.export_filter.apply(&all)
        } else {
            all.clone()
        };

        let mut filtered: Vec<ProcessRecord> = match &self.filter {
            Some(filter) => all.into_iter().filter(|p| filter.is_match(p)).collect(),
            None => all,
        };

        let key = self.sort_key();
        if key.needs_standard() {
            for record in filtered.iter_mut() {
                fetch_standard(source, &mut self.io_old, record, now);
            }
        }

        self.degraded = match sort_processes(&mut filtered, key) {
            Ok(()) => false,
            Err(e) => {
                log::debug!("Process list left unsorted: {}", e);
                true
            }
        };

        self.visible = match self.max_processes {
            Some(max) if !self.degraded => max.min(filtered.len()),
            _ => filtered.len(),
        };

        // In tree mode the rows shown are the head of the flattened tree
        let shown: HashSet<u32> = if self.tree_enabled {
            let limit = self.max_processes.unwrap_or(filtered.len());
            flatten_tree(&build_process_tree(&filtered, key))
                .iter()
                .take(limit)
                .map(|node| node.process.pid)
                .collect()
        } else {
            filtered.iter().take(self.visible).map(|p| p.pid).collect()
        };

        for record in filtered.iter_mut().filter(|p| shown.contains(&p.pid)) {
            fetch_standard(source, &mut self.io_old, record, now);
            if self.extended_enabled {
                fetch_extended(source, &mut self.running_stats, record);
            }
        }

        self.io_old.retain(|pid, _| live.contains(pid));
        self.running_stats.retain(|pid, _| live.contains(pid));

        self.max_values = MaxValues {
            cpu_percent: filtered.iter().map(|p| p.cpu_percent).fold(0.0, f64::max),
            memory_percent: filtered.iter().map(|p| p.memory_percent).fold(0.0, f64::max),
        };

        self.tree = if self.tree_enabled {
            Some(build_process_tree(&filtered, key))
        } else {
            None
        };
        self.filtered = filtered;
        Ok(())
    }

    /// Sorted, filtered and capped list
    pub fn processes(&self) -> &[ProcessRecord] {
        &self.filtered[..self.visible]
    }

    /// Sorted and filtered list, without the cap
    pub fn all_processes(&self) -> &[ProcessRecord] {
        &self.filtered
    }

    pub fn export_list(&self) -> &[ProcessRecord] {
        &self.export
    }

    pub fn count(&self) -> &ProcessCount {
        &self.count
    }

    pub fn max_values(&self) -> MaxValues {
        self.max_values
    }

    pub fn tree(&self) -> Option<&ProcessTreeNode> {
        self.tree.as_ref()
    }

    pub fn programs(&self) -> Vec<ProgramRecord> {
        processes_to_programs(&self.filtered, self.sort_key())
    }

    /// At least one process table has been read
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The last sort failed and the list is neither sorted nor capped
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Sizes of the command line and username caches
    pub fn cache_sizes(&self) -> (usize, usize) {
        (self.cmdline_cache.len(), self.username_cache.len())
    }
}

/// Read the standard tier once per cycle and derive the I/O rate from the
/// previous sample of the same PID.
fn fetch_standard(
    source: &mut dyn MetricSource,
    io_old: &mut HashMap<u32, (IoBytes, Instant)>,
    record: &mut ProcessRecord,
    now: Instant,
) {
    if record.has_standard() {
        return;
    }

    match source.process_standard(record.pid) {
        Ok(standard) => {
            record.nice = standard.nice;
            record.num_threads = standard.num_threads.or(record.num_threads);
            record.cpu_times = standard.cpu_times;
            record.io_counters = Some(match standard.io {
                Some(io) => io_rate(io_old, record.pid, io, now),
                None => IoCounters::unavailable(),
            });
        }
        Err(e) => {
            if !e.is_transient() {
                log::debug!("Standard fields unavailable for pid {}: {}", record.pid, e);
            }
            record.io_counters = Some(IoCounters::unavailable());
        }
    }
}

fn io_rate(
    io_old: &mut HashMap<u32, (IoBytes, Instant)>,
    pid: u32,
    io: IoBytes,
    now: Instant,
) -> IoCounters {
    let mut counters = IoCounters {
        read_bytes: io.read_bytes,
        write_bytes: io.write_bytes,
        available: true,
        ..Default::default()
    };

    if let Some((previous, at)) = io_old.insert(pid, (io, now)) {
        let elapsed = now.saturating_duration_since(at).as_secs_f64();
        if elapsed > 0.0 {
            counters.read_rate = io.read_bytes.saturating_sub(previous.read_bytes) as f64 / elapsed;
            counters.write_rate =
                io.write_bytes.saturating_sub(previous.write_bytes) as f64 / elapsed;
        }
    }
    counters
}

fn fetch_extended(
    source: &mut dyn MetricSource,
    running_stats: &mut HashMap<u32, RunningStats>,
    record: &mut ProcessRecord,
) {
    let mut extended = match source.process_extended(record.pid) {
        Ok(counters) => ExtendedStats {
            num_fds: counters.num_fds,
            ctx_switches_voluntary: counters.ctx_switches_voluntary,
            ctx_switches_involuntary: counters.ctx_switches_involuntary,
            tcp: counters.tcp,
            udp: counters.udp,
            ..Default::default()
        },
        Err(e) => {
            if !e.is_transient() {
                log::debug!("Extended fields unavailable for pid {}: {}", record.pid, e);
            }
            ExtendedStats::default()
        }
    };

    let stats = running_stats.entry(record.pid).or_default();
    stats.record(record.cpu_percent, record.memory_percent);
    stats.apply(&mut extended);
    record.extended = Some(extended);
}

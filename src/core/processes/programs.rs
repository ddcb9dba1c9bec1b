//! Processes grouped by program name.

use serde::{Deserialize, Serialize};

use crate::core::source::CpuTimes;

use super::record::{MemoryInfo, ProcessRecord};
use super::sort::SortKey;

/// Placeholder for fields that differ between the members of a program
pub const MIXED: &str = "_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub name: String,
    pub nprocs: usize,
    pub childrens: Vec<u32>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_info: MemoryInfo,
    pub num_threads: u64,
    pub cpu_times: CpuTimes,
    pub io_read_rate: f64,
    pub io_write_rate: f64,
    pub username: String,
    pub nice: String,
    pub status: String,
}

impl ProgramRecord {
    fn from_process(p: &ProcessRecord) -> Self {
        let mut program = Self {
            name: p.name.clone(),
            username: p.username.clone().unwrap_or_else(|| MIXED.to_string()),
            nice: nice_label(p),
            status: p.status.clone(),
            ..Default::default()
        };
        program.accumulate(p);
        program
    }

    fn merge(&mut self, p: &ProcessRecord) {
        self.accumulate(p);
        if p.username.as_deref() != Some(self.username.as_str()) {
            self.username = MIXED.to_string();
        }
        if nice_label(p) != self.nice {
            self.nice = MIXED.to_string();
        }
        if p.status != self.status {
            self.status = MIXED.to_string();
        }
    }

    fn accumulate(&mut self, p: &ProcessRecord) {
        self.childrens.push(p.pid);
        self.nprocs = self.childrens.len();
        self.cpu_percent += p.cpu_percent;
        self.memory_percent += p.memory_percent;
        self.memory_info.rss += p.memory_info.rss;
        self.memory_info.vms += p.memory_info.vms;
        self.num_threads += u64::from(p.num_threads.unwrap_or(0));
        if let Some(times) = p.cpu_times {
            self.cpu_times.user += times.user;
            self.cpu_times.system += times.system;
        }
        if let Some(io) = p.io_counters {
            self.io_read_rate += io.read_rate;
            self.io_write_rate += io.write_rate;
        }
    }

    fn sort_value(&self, key: SortKey) -> f64 {
        match key {
            SortKey::MemoryPercent => self.memory_percent,
            SortKey::CpuTimes => self.cpu_times.user + self.cpu_times.system,
            SortKey::IoCounters => self.io_read_rate + self.io_write_rate,
            _ => self.cpu_percent,
        }
    }
}

fn nice_label(p: &ProcessRecord) -> String {
    p.nice
        .map(|n| n.to_string())
        .unwrap_or_else(|| MIXED.to_string())
}

/// Group processes by name, in order of first appearance, then order the
/// programs by `key`.
pub fn processes_to_programs(processes: &[ProcessRecord], key: SortKey) -> Vec<ProgramRecord> {
    let mut programs: Vec<ProgramRecord> = Vec::new();
    for p in processes {
        match programs.iter_mut().find(|program| program.name == p.name) {
            Some(program) => program.merge(p),
            None => programs.push(ProgramRecord::from_process(p)),
        }
    }

    if key.is_textual() {
        programs.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    } else {
        programs.sort_by(|a, b| b.sort_value(key).total_cmp(&a.sort_value(key)));
    }
    programs
}

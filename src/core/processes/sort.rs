//! Process ordering.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{HostwatchError, Result};

use super::record::ProcessRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CpuPercent,
    MemoryPercent,
    Username,
    CpuTimes,
    IoCounters,
    Name,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::CpuPercent,
        SortKey::MemoryPercent,
        SortKey::Username,
        SortKey::CpuTimes,
        SortKey::IoCounters,
        SortKey::Name,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::CpuPercent => "cpu_percent",
            SortKey::MemoryPercent => "memory_percent",
            SortKey::Username => "username",
            SortKey::CpuTimes => "cpu_times",
            SortKey::IoCounters => "io_counters",
            SortKey::Name => "name",
        }
    }

    /// Textual keys sort ascending and are never summed over a subtree.
    pub fn is_textual(self) -> bool {
        matches!(self, SortKey::Name | SortKey::Username)
    }

    /// Keys backed by standard-tier fields, which must be fetched for every
    /// candidate before sorting.
    pub fn needs_standard(self) -> bool {
        matches!(self, SortKey::CpuTimes | SortKey::IoCounters)
    }

    /// Numeric value of the key, `None` when the field is absent.
    pub fn number(self, process: &ProcessRecord) -> Option<f64> {
        match self {
            SortKey::CpuPercent => Some(process.cpu_percent),
            SortKey::MemoryPercent => Some(process.memory_percent),
            SortKey::CpuTimes => process.cpu_times.map(|t| t.user + t.system),
            SortKey::IoCounters => process.io_counters.map(|io| io.total_rate()),
            SortKey::Name | SortKey::Username => None,
        }
    }

    pub fn text(self, process: &ProcessRecord) -> Option<&str> {
        match self {
            SortKey::Name => Some(process.name.as_str()),
            SortKey::Username => process.username.as_deref(),
            _ => None,
        }
    }

    fn is_present(self, process: &ProcessRecord) -> bool {
        match self {
            SortKey::CpuTimes => process.cpu_times.is_some(),
            SortKey::IoCounters => process.io_counters.is_some(),
            _ => true,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = HostwatchError;

    fn from_str(s: &str) -> Result<Self> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| HostwatchError::config(format!("unknown sort key '{}'", s)))
    }
}

/// Parse a configured sort key; `auto` yields `None`.
pub fn parse_sort_mode(s: &str) -> Result<Option<SortKey>> {
    if s.eq_ignore_ascii_case("auto") || s.is_empty() {
        Ok(None)
    } else {
        s.parse().map(Some)
    }
}

/// Order by `key`, ties broken by memory percent.
pub fn compare(a: &ProcessRecord, b: &ProcessRecord, key: SortKey) -> Ordering {
    let primary = if key.is_textual() {
        let left = key.text(a).unwrap_or("~");
        let right = key.text(b).unwrap_or("~");
        left.to_lowercase().cmp(&right.to_lowercase())
    } else {
        let left = key.number(a).unwrap_or(f64::NEG_INFINITY);
        let right = key.number(b).unwrap_or(f64::NEG_INFINITY);
        right.total_cmp(&left)
    };
    primary.then_with(|| b.memory_percent.total_cmp(&a.memory_percent))
}

/// Sort in place: descending, ascending for name/username.
///
/// Fails without touching the slice when a process lacks the key.
pub fn sort_processes(processes: &mut [ProcessRecord], key: SortKey) -> Result<()> {
    if let Some(missing) = processes.iter().find(|p| !key.is_present(p)) {
        return Err(HostwatchError::other(format!(
            "sort key {} absent for pid {}",
            key, missing.pid
        )));
    }
    processes.sort_by(|a, b| compare(a, b, key));
    Ok(())
}

/// Names of the first `n` processes ranked by `key`. Absent values rank last.
pub fn top_names(processes: &[ProcessRecord], key: SortKey, n: usize) -> Vec<String> {
    let mut ranked: Vec<&ProcessRecord> = processes.iter().collect();
    ranked.sort_by(|a, b| compare(a, b, key));
    ranked.into_iter().take(n).map(|p| p.name.clone()).collect()
}

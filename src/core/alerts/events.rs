//! Bounded log of alert episodes.
//!
//! An episode opens when a metric type first reaches WARNING or CRITICAL,
//! aggregates every sample while the condition holds, and closes on the
//! first OK/CAREFUL sample. Episodes shorter than the peak time are dropped.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::config::{DEFAULT_MAX_EVENTS, DEFAULT_MIN_INTERVAL, DEFAULT_PEAK_TIME};
use crate::core::processes::{sort::top_names, ProcessRecord, SortKey};

use super::thresholds::Status;

/// `end` value of an episode still in progress
pub const ONGOING: i64 = -1;

const TOP_OFFENDERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEntry {
    /// Epoch seconds
    pub begin: i64,
    pub end: i64,
    pub state: Status,
    #[serde(rename = "type")]
    pub event_type: String,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
    pub avg: f64,
    /// Names of the top processes at the last CRITICAL sample
    pub top: Vec<String>,
    pub desc: String,
    pub sort: SortKey,
    pub global_msg: String,
}

impl AlertEntry {
    pub fn is_ongoing(&self) -> bool {
        self.end == ONGOING
    }

    pub fn is_finished(&self) -> bool {
        !self.is_ongoing()
    }

    pub fn duration(&self, now: i64) -> i64 {
        let end = if self.is_ongoing() { now } else { self.end };
        end - self.begin
    }

    fn record(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
        self.avg = self.sum / self.count as f64;
    }
}

/// One evaluated sample handed to [`AlertLog::add`]
#[derive(Debug, Clone, Copy)]
pub struct AlertSample<'a> {
    pub state: Status,
    pub event_type: &'a str,
    pub value: f64,
    pub desc: &'a str,
    pub global_msg: &'a str,
}

/// Sort key used to rank offenders for an alert type
pub fn sort_key_for(event_type: &str) -> SortKey {
    if event_type.starts_with("MEM") {
        SortKey::MemoryPercent
    } else if event_type.starts_with("CPU_IOWAIT") {
        SortKey::IoCounters
    } else {
        SortKey::CpuPercent
    }
}

#[derive(Debug, Clone)]
pub struct AlertLog {
    events: VecDeque<AlertEntry>,
    max_events: usize,
    peak_time: f64,
    min_interval: f64,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENTS, DEFAULT_PEAK_TIME, DEFAULT_MIN_INTERVAL)
    }
}

impl AlertLog {
    pub fn new(max_events: usize, peak_time: f64, min_interval: f64) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
            peak_time,
            min_interval,
        }
    }

    /// Record a sample stamped with the current time. Returns the log length.
    pub fn add(&mut self, sample: AlertSample<'_>, processes: &[ProcessRecord]) -> usize {
        self.add_at(chrono::Utc::now().timestamp(), sample, processes)
    }

    pub fn add_at(
        &mut self,
        now: i64,
        sample: AlertSample<'_>,
        processes: &[ProcessRecord],
    ) -> usize {
        match self.position(now, sample.event_type) {
            None => self.open(now, sample),
            Some(index) => self.update(now, index, sample, processes),
        }
        self.events.len()
    }

    /// Ongoing episode of this type, or one closed less than `min_interval` ago
    fn position(&self, now: i64, event_type: &str) -> Option<usize> {
        self.events.iter().position(|e| {
            e.event_type == event_type
                && (e.is_ongoing() || ((now - e.end) as f64) < self.min_interval)
        })
    }

    fn open(&mut self, now: i64, sample: AlertSample<'_>) {
        if !sample.state.is_alert() {
            return;
        }

        log::info!(
            "Alert {} opened: {} ({:.1})",
            sample.event_type,
            sample.state,
            sample.value
        );

        self.events.push_front(AlertEntry {
            begin: now,
            end: ONGOING,
            state: sample.state,
            event_type: sample.event_type.to_string(),
            min: sample.value,
            max: sample.value,
            sum: sample.value,
            count: 1,
            avg: sample.value,
            top: Vec::new(),
            desc: sample.desc.to_string(),
            sort: sort_key_for(sample.event_type),
            global_msg: sample.global_msg.to_string(),
        });

        while self.events.len() > self.max_events {
            self.events.pop_back();
        }
    }

    fn update(
        &mut self,
        now: i64,
        index: usize,
        sample: AlertSample<'_>,
        processes: &[ProcessRecord],
    ) {
        let Some(entry) = self.events.get_mut(index) else {
            return;
        };

        if !sample.state.is_alert() {
            if entry.is_ongoing() {
                self.close(now, index);
            }
            return;
        }

        entry.end = ONGOING;
        entry.record(sample.value);
        if sample.state == Status::Critical {
            entry.state = Status::Critical;
            entry.sort = sort_key_for(&entry.event_type);
            entry.top = top_names(processes, entry.sort, TOP_OFFENDERS);
        }
        entry.desc = sample.desc.to_string();
        entry.global_msg = sample.global_msg.to_string();
    }

    fn close(&mut self, now: i64, index: usize) {
        let Some(entry) = self.events.get(index) else {
            return;
        };

        if ((now - entry.begin) as f64) < self.peak_time {
            log::debug!(
                "Alert {} lasted {}s, discarded as a peak",
                entry.event_type,
                now - entry.begin
            );
            self.events.remove(index);
        } else if let Some(entry) = self.events.get_mut(index) {
            entry.end = now;
            log::info!(
                "Alert {} closed after {}s (max {:.1})",
                entry.event_type,
                now - entry.begin,
                entry.max
            );
        }
    }

    /// Newest first
    pub fn get(&self) -> Vec<AlertEntry> {
        self.events.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlertEntry> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove finished episodes; CRITICAL ones are kept unless `critical` is set.
    /// Returns the log length.
    pub fn clean(&mut self, critical: bool) -> usize {
        self.events
            .retain(|e| e.is_ongoing() || (!critical && e.state == Status::Critical));
        self.events.len()
    }

    /// Sort key of the newest ongoing episode
    pub fn sort_key_hint(&self) -> Option<SortKey> {
        self.events.iter().find(|e| e.is_ongoing()).map(|e| e.sort)
    }

    pub fn set_max_events(&mut self, max_events: usize) {
        self.max_events = max_events;
        while self.events.len() > self.max_events {
            self.events.pop_back();
        }
    }

    pub fn peak_time(&self) -> f64 {
        self.peak_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(state: Status, value: f64) -> AlertSample<'static> {
        AlertSample {
            state,
            event_type: "CPU_USER",
            value,
            desc: "",
            global_msg: "EVENTS history",
        }
    }

    fn process(name: &str, cpu: f64, mem: f64) -> ProcessRecord {
        ProcessRecord {
            name: name.to_string(),
            cpu_percent: cpu,
            memory_percent: mem,
            ..Default::default()
        }
    }

    fn replay(log: &mut AlertLog, step: i64) {
        let sequence = [
            (Status::Ok, 10.0),
            (Status::Warning, 75.0),
            (Status::Warning, 80.0),
            (Status::Critical, 95.0),
            (Status::Ok, 20.0),
        ];
        for (i, (state, value)) in sequence.iter().enumerate() {
            log.add_at(1_000 + step * i as i64, sample(*state, *value), &[]);
        }
    }

    #[test]
    fn test_short_episode_is_discarded() {
        let mut log = AlertLog::new(10, 6.0, 6.0);
        replay(&mut log, 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_long_episode_is_retained_and_escalated() {
        let mut log = AlertLog::new(10, 6.0, 6.0);
        replay(&mut log, 10);
        let events = log.get();
        assert_eq!(events.len(), 1);
        let entry = &events[0];
        assert_eq!(entry.state, Status::Critical);
        assert_eq!(entry.begin, 1_010);
        assert_eq!(entry.end, 1_040);
        assert!(entry.is_finished());
    }

    #[test]
    fn test_aggregates() {
        let mut log = AlertLog::new(10, 6.0, 6.0);
        log.add_at(0, sample(Status::Warning, 70.0), &[]);
        log.add_at(10, sample(Status::Warning, 90.0), &[]);
        log.add_at(20, sample(Status::Warning, 80.0), &[]);
        let entry = &log.get()[0];
        assert_eq!(entry.min, 70.0);
        assert_eq!(entry.max, 90.0);
        assert_eq!(entry.sum, 240.0);
        assert_eq!(entry.count, 3);
        assert_eq!(entry.avg, 80.0);
        assert!(entry.is_ongoing());
    }

    #[test]
    fn test_ok_without_episode_creates_nothing() {
        let mut log = AlertLog::default();
        assert_eq!(log.add_at(0, sample(Status::Careful, 55.0), &[]), 0);
        assert_eq!(log.add_at(1, sample(Status::Ok, 5.0), &[]), 0);
    }

    #[test]
    fn test_escalation_is_one_directional() {
        let mut log = AlertLog::default();
        log.add_at(0, sample(Status::Warning, 75.0), &[]);
        log.add_at(5, sample(Status::Critical, 95.0), &[]);
        log.add_at(10, sample(Status::Warning, 75.0), &[]);
        assert_eq!(log.get()[0].state, Status::Critical);
    }

    #[test]
    fn test_critical_sample_records_top_offenders() {
        let processes = vec![
            process("idle", 0.1, 1.0),
            process("make", 80.0, 2.0),
            process("cc1", 95.0, 3.0),
            process("ld", 40.0, 9.0),
        ];
        let mut log = AlertLog::default();
        log.add_at(0, sample(Status::Warning, 75.0), &processes);
        assert!(log.get()[0].top.is_empty());
        log.add_at(5, sample(Status::Critical, 95.0), &processes);
        assert_eq!(log.get()[0].top, vec!["cc1", "make", "ld"]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = AlertLog::new(2, 6.0, 6.0);
        for (i, kind) in ["CPU_USER", "MEM", "LOAD"].iter().enumerate() {
            log.add_at(
                i as i64,
                AlertSample {
                    event_type: *kind,
                    ..sample(Status::Warning, 80.0)
                },
                &[],
            );
        }
        let types: Vec<_> = log.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["LOAD", "MEM"]);
    }

    #[test]
    fn test_recently_closed_episode_is_reopened() {
        let mut log = AlertLog::new(10, 6.0, 6.0);
        log.add_at(0, sample(Status::Warning, 75.0), &[]);
        log.add_at(10, sample(Status::Ok, 10.0), &[]);
        log.add_at(12, sample(Status::Warning, 78.0), &[]);
        assert_eq!(log.len(), 1);
        let entry = &log.get()[0];
        assert!(entry.is_ongoing());
        assert_eq!(entry.count, 2);

        log.add_at(20, sample(Status::Ok, 10.0), &[]);
        log.add_at(40, sample(Status::Warning, 75.0), &[]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_clean() {
        let mut log = AlertLog::new(10, 0.0, 0.0);
        log.add_at(0, sample(Status::Warning, 75.0), &[]);
        log.add_at(10, sample(Status::Ok, 10.0), &[]);
        log.add_at(
            20,
            AlertSample {
                event_type: "MEM",
                ..sample(Status::Critical, 95.0)
            },
            &[],
        );
        log.add_at(
            30,
            AlertSample {
                event_type: "MEM",
                ..sample(Status::Ok, 10.0)
            },
            &[],
        );
        log.add_at(
            40,
            AlertSample {
                event_type: "LOAD",
                ..sample(Status::Warning, 10.0)
            },
            &[],
        );
        assert_eq!(log.len(), 3);
        assert_eq!(log.clean(false), 2);
        assert_eq!(log.clean(true), 1);
        assert_eq!(log.get()[0].event_type, "LOAD");
    }

    #[test]
    fn test_sort_key_for_type() {
        assert_eq!(sort_key_for("MEM"), SortKey::MemoryPercent);
        assert_eq!(sort_key_for("MEMSWAP"), SortKey::MemoryPercent);
        assert_eq!(sort_key_for("CPU_IOWAIT"), SortKey::IoCounters);
        assert_eq!(sort_key_for("LOAD"), SortKey::CpuPercent);
    }
}

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use crate::core::config::DEFAULT_HISTORY_SIZE;

/// One timestamped sample (epoch seconds, value)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Bounded per-item history of a plugin's fields.
#[derive(Debug, Clone)]
pub struct History {
    capacity: usize,
    items: BTreeMap<String, VecDeque<HistoryPoint>>,
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            items: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, item: &str, timestamp: i64, value: f64) {
        if self.capacity == 0 {
            return;
        }
        let capacity = self.capacity;
        let queue = self
            .items
            .entry(item.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity.min(64)));
        Self::push_value(queue, HistoryPoint { timestamp, value }, capacity);
    }

    fn push_value<T>(queue: &mut VecDeque<T>, value: T, capacity: usize) {
        if queue.len() >= capacity {
            queue.pop_front();
        }
        queue.push_back(value);
    }

    pub fn get(&self, item: &str) -> Option<&VecDeque<HistoryPoint>> {
        self.items.get(item)
    }

    pub fn values(&self, item: &str) -> Vec<f64> {
        self.items
            .get(item)
            .map(|points| points.iter().map(|p| p.value).collect())
            .unwrap_or_default()
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Mean of the newer half minus mean of the older half of the last `n`
    /// points. `None` with fewer than two points.
    pub fn trend(&self, item: &str, n: usize) -> Option<f64> {
        let points = self.items.get(item)?;
        let n = n.min(points.len());
        if n < 2 {
            return None;
        }
        let recent: Vec<f64> = points.iter().skip(points.len() - n).map(|p| p.value).collect();
        let (older, newer) = recent.split_at(n / 2);
        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
        Some(mean(newer) - mean(older))
    }

    pub fn reset(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

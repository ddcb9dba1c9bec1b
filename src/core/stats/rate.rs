use std::collections::HashMap;
use std::time::Instant;

/// Per-second rates from cumulative counters, one previous sample per item.
#[derive(Debug, Clone, Default)]
pub struct CounterRates {
    previous: HashMap<String, (Vec<u64>, Instant)>,
}

/// Rates of one item plus the seconds since its previous sample
#[derive(Debug, Clone, PartialEq)]
pub struct Rates {
    pub values: Vec<f64>,
    pub elapsed: f64,
}

impl CounterRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rates of `counters` since the last call for `item`. The first sample
    /// of an item, and counters that went backwards, yield zero.
    pub fn update(&mut self, item: &str, counters: &[u64], now: Instant) -> Rates {
        let previous = self
            .previous
            .insert(item.to_string(), (counters.to_vec(), now));

        let Some((old, at)) = previous else {
            return Rates {
                values: vec![0.0; counters.len()],
                elapsed: 0.0,
            };
        };

        let elapsed = now.saturating_duration_since(at).as_secs_f64();
        let values = counters
            .iter()
            .enumerate()
            .map(|(i, current)| {
                let before = old.get(i).copied().unwrap_or(*current);
                if elapsed > 0.0 {
                    current.saturating_sub(before) as f64 / elapsed
                } else {
                    0.0
                }
            })
            .collect();
        Rates { values, elapsed }
    }

    /// Forget items that disappeared
    pub fn retain<'a>(&mut self, live: impl IntoIterator<Item = &'a str>) {
        let live: Vec<&str> = live.into_iter().collect();
        self.previous.retain(|item, _| live.contains(&item.as_str()));
    }
}

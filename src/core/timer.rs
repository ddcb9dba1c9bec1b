//! Countdown timer used to gate expensive OS reads.
//!
//! A plugin or sub-collector only hits the metric source when its timer has
//! expired; otherwise it serves the value cached on the previous read.

use std::time::{Duration, Instant};

/// Longest interval a timer or configured delay is armed for
pub const MAX_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Deadline-based countdown.
#[derive(Debug, Clone)]
pub struct Timer {
    duration: Duration,
    deadline: Instant,
}

impl Timer {
    /// Create a timer armed from now.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: deadline_after(duration),
        }
    }

    /// A zero-duration timer, expired from the start.
    pub fn expired_now() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Expired from the start; [`Timer::rearm`] then applies `duration`.
    pub fn expired_with(duration: Duration) -> Self {
        Self {
            duration,
            deadline: Instant::now(),
        }
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new(duration_from_secs(secs))
    }

    /// Record a new deadline of now + `duration`.
    pub fn arm(&mut self, duration: Duration) {
        self.duration = duration;
        self.deadline = deadline_after(duration);
    }

    /// Re-apply the last duration from now.
    pub fn rearm(&mut self) {
        self.deadline = deadline_after(self.duration);
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::expired_now()
    }
}

/// Measures seconds elapsed between successive calls to [`UpdateClock::tick`].
#[derive(Debug, Clone, Default)]
pub struct UpdateClock {
    last: Option<Instant>,
}

impl UpdateClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick; 1.0 on the first one so rates stay finite.
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f64 {
        let elapsed = match self.last {
            Some(last) => now.saturating_duration_since(last).as_secs_f64(),
            None => 1.0,
        };
        self.last = Some(now);
        elapsed
    }
}

/// `now + duration`, saturating at [`MAX_DURATION`] from now.
fn deadline_after(duration: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(duration.min(MAX_DURATION))
        .or_else(|| now.checked_add(MAX_DURATION))
        .unwrap_or(now)
}

/// Negative, NaN and infinite values collapse to zero; values past
/// [`MAX_DURATION`] are clamped to it.
pub fn duration_from_secs(secs: f64) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs)
        .map(|duration| duration.min(MAX_DURATION))
        .unwrap_or(MAX_DURATION)
}

//! # Progress Sampler
//!
//! Self-rescheduling poll of the active backend's loaded and played
//! fractions. Each tick is compared against the last snapshot and only the
//! fields that changed are reported. The next tick is scheduled one interval
//! after the current one was handled, so ticks never overlap.

use core_async::time::{Duration, Instant};
use core_runtime::events::ProgressUpdate;

/// Last observed `{loaded, played}` fractions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressSnapshot {
    pub loaded: f64,
    pub played: f64,
}

/// One reading taken from a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressReading {
    pub loaded: Option<f64>,
    pub played: Option<f64>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ProgressSampler {
    interval: Duration,
    next_tick: Option<Instant>,
    last: ProgressSnapshot,
}

impl ProgressSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: None,
            last: ProgressSnapshot::default(),
        }
    }

    /// Schedules the first tick one interval from `now`, unless running.
    pub fn start(&mut self, now: Instant) {
        if self.next_tick.is_none() {
            self.next_tick = Some(now + self.interval);
        }
    }

    pub fn stop(&mut self) {
        self.next_tick = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_tick.is_some_and(|at| at <= now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Changes the cadence. Applies from the next reschedule on.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Clears the snapshot; used when a new resource is loaded.
    pub fn reset_snapshot(&mut self) {
        self.last = ProgressSnapshot::default();
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.last
    }

    /// Processes one tick and schedules the next.
    ///
    /// Unknown fractions count as `0`. The snapshot is updated whether or not
    /// an update is returned.
    pub fn tick(&mut self, reading: ProgressReading, now: Instant) -> Option<ProgressUpdate> {
        self.next_tick = Some(now + self.interval);

        let loaded = reading.loaded.unwrap_or(0.0);
        let played = reading.played.unwrap_or(0.0);
        let duration = reading.duration.filter(|d| d.is_finite() && *d > 0.0);

        let mut update = ProgressUpdate::default();
        if loaded != self.last.loaded {
            update.loaded = Some(loaded);
            update.loaded_seconds = duration.map(|d| loaded * d);
        }
        if played != self.last.played {
            update.played = Some(played);
            update.played_seconds = duration.map(|d| played * d);
        }

        self.last = ProgressSnapshot { loaded, played };

        if update.is_empty() {
            None
        } else {
            Some(update)
        }
    }
}

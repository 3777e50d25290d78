//! # Duration Probe
//!
//! Repeatedly asks the active backend for its duration until a usable value
//! appears, then reports it exactly once per loaded resource.
//!
//! The probe holds no timer of its own. It exposes the instant of its next
//! check through [`DurationProbe::deadline`]; whoever drives the engine
//! sleeps until then and calls [`DurationProbe::check`].

use core_async::time::{Duration, Instant};

/// Timed, bounded-delay duration poller.
#[derive(Debug, Clone)]
pub struct DurationProbe {
    interval: Duration,
    next_check: Option<Instant>,
    reported: bool,
}

impl DurationProbe {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_check: None,
            reported: false,
        }
    }

    /// Arms the probe for an immediate check.
    ///
    /// No-op if a check is already scheduled or the duration has already been
    /// reported for this resource.
    pub fn start(&mut self, now: Instant) {
        if !self.reported {
            self.next_check = Some(self.next_check.map_or(now, |at| at.min(now)));
        }
    }

    /// Returns `true` if a check is scheduled at or before `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_check.is_some_and(|at| at <= now)
    }

    /// Evaluates one duration reading.
    ///
    /// Returns the duration the first time a positive, non-NaN value is seen.
    /// Otherwise reschedules the next check one interval from `now`.
    pub fn check(&mut self, duration: Option<f64>, now: Instant) -> Option<f64> {
        if self.reported || self.next_check.is_none() {
            return None;
        }

        match duration.filter(|d| !d.is_nan() && *d > 0.0) {
            Some(duration) => {
                self.reported = true;
                self.next_check = None;
                Some(duration)
            }
            None => {
                self.next_check = Some(now + self.interval);
                None
            }
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next_check
    }

    /// Stops polling without forgetting whether the duration was reported.
    pub fn cancel(&mut self) {
        self.next_check = None;
    }

    /// Forgets everything; used when a new resource is loaded.
    pub fn reset(&mut self) {
        self.next_check = None;
        self.reported = false;
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }
}

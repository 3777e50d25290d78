//! # Declarative Playback State
//!
//! The snapshot a caller hands to the player each time its intent changes.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Desired playback state. Immutable per snapshot.
///
/// `resource = None` means idle: nothing loaded, nothing polled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub resource: Option<String>,
    pub playing: bool,
    /// Volume in [0.0, 1.0]
    pub volume: f64,
    pub muted: bool,
    pub playback_rate: f64,
    /// Cadence of progress sampling
    pub progress_interval: Duration,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            resource: None,
            playing: false,
            volume: 0.8,
            muted: false,
            playback_rate: 1.0,
            progress_interval: Duration::from_millis(1000),
        }
    }
}

impl PlaybackState {
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn without_resource(mut self) -> Self {
        self.resource = None;
        self
    }

    pub fn with_playing(mut self, playing: bool) -> Self {
        self.playing = playing;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_playback_rate(mut self, rate: f64) -> Self {
        self.playback_rate = rate;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Volume the backend should actually output.
    pub fn effective_volume(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(PlaybackError::InvalidVolume(self.volume));
        }

        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(PlaybackError::InvalidPlaybackRate(self.playback_rate));
        }

        if self.progress_interval.is_zero() {
            return Err(PlaybackError::InvalidProgressInterval);
        }

        Ok(())
    }
}

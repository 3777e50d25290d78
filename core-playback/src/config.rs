//! # Player Configuration
//!
//! Settings that stay fixed across state snapshots: which backend kinds are
//! kept warm, and the timing of the duration probe and deferred seeks.

use crate::error::{PlaybackError, Result};
use crate::kinds::BackendKind;
use core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Backend kinds to keep a warm instance of while another kind is active.
    ///
    /// Default: none.
    #[serde(default)]
    pub preload: BTreeSet<BackendKind>,

    /// Delay between duration queries until a duration is known.
    ///
    /// Default: 100 ms.
    #[serde(default = "default_duration_probe_interval")]
    pub duration_probe_interval: Duration,

    /// How long a seek requested before the backend is ready stays valid.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_pending_seek_expiry")]
    pub pending_seek_expiry: Duration,

    /// Capacity of the outbound event channel per subscriber.
    ///
    /// Default: 100 events.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            preload: BTreeSet::new(),
            duration_probe_interval: default_duration_probe_interval(),
            pending_seek_expiry: default_pending_seek_expiry(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl PlayerConfig {
    pub fn with_preload(mut self, kind: BackendKind) -> Self {
        self.preload.insert(kind);
        self
    }

    pub fn with_duration_probe_interval(mut self, interval: Duration) -> Self {
        self.duration_probe_interval = interval;
        self
    }

    pub fn with_pending_seek_expiry(mut self, expiry: Duration) -> Self {
        self.pending_seek_expiry = expiry;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    pub fn preloads(&self, kind: &BackendKind) -> bool {
        self.preload.contains(kind)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.duration_probe_interval.is_zero() {
            return Err(PlaybackError::InvalidConfig(
                "duration_probe_interval must be > 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(PlaybackError::InvalidConfig(
                "event_buffer_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_duration_probe_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_pending_seek_expiry() -> Duration {
    Duration::from_secs(5)
}

fn default_event_buffer_size() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}

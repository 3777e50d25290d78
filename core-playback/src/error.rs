//! # Playback Error Types
//!
//! Errors returned by the player's command methods. Failures reported by
//! backends are not returned from calls; they are converted into a
//! [`PlaybackError`] and reach the caller as `PlayerEvent::Error`.

use crate::traits::BackendError;
use core_runtime::events::PlayerErrorKind;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// No registered backend, including the fallback, accepts the resource.
    #[error("No backend can play resource: {0}")]
    UnsupportedResource(String),

    /// The backend could not prepare the resource.
    #[error("Failed to load resource: {0}")]
    LoadFailure(String),

    /// The backend failed after the resource was prepared.
    #[error("Playback failed: {0}")]
    Playback(String),

    // ========================================================================
    // Caller Input Errors
    // ========================================================================
    /// Volume outside [0.0, 1.0].
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f64),

    /// Playback rate that is not a positive finite number.
    #[error("Invalid playback rate: {0} (must be positive)")]
    InvalidPlaybackRate(f64),

    /// Progress interval of zero.
    #[error("Progress interval must be greater than zero")]
    InvalidProgressInterval,

    #[error("Invalid player configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Coordinator Errors
    // ========================================================================
    /// The player's actor task has stopped.
    #[error("Player has shut down")]
    PlayerShutDown,
}

impl PlaybackError {
    /// Returns `true` if retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackError::LoadFailure(_))
    }

    /// Returns `true` if the error was caused by invalid caller input.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidVolume(_)
                | PlaybackError::InvalidPlaybackRate(_)
                | PlaybackError::InvalidProgressInterval
                | PlaybackError::InvalidConfig(_)
        )
    }

    /// The event kind this error is reported as, for errors that surface
    /// through `PlayerEvent::Error`.
    pub fn event_kind(&self) -> Option<PlayerErrorKind> {
        match self {
            PlaybackError::UnsupportedResource(_) => Some(PlayerErrorKind::UnsupportedResource),
            PlaybackError::LoadFailure(_) => Some(PlayerErrorKind::LoadFailure),
            PlaybackError::Playback(_) => Some(PlayerErrorKind::Playback),
            _ => None,
        }
    }
}

impl From<BackendError> for PlaybackError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::Load(message) => PlaybackError::LoadFailure(message),
            BackendError::Playback(message) => PlaybackError::Playback(message),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

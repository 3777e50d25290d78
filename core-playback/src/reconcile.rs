//! # State Reconciliation
//!
//! Turns two successive [`PlaybackState`] snapshots into the imperative
//! commands that move a backend from the first to the second. Only fields
//! whose value changed produce a command, so re-submitting an identical
//! snapshot is free and never disturbs the backend.
//!
//! The function is pure; the engine decides how each command is carried out
//! (instance selection for `Load`, deferral before readiness, and so on).

use crate::state::PlaybackState;

/// An imperative action derived from a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// A new non-empty resource was requested.
    Load(String),
    /// The resource was cleared.
    Stop,
    Play,
    Pause,
    SetVolume(f64),
    SetPlaybackRate(f64),
}

/// Computes the commands needed to converge from `prev` to `next`.
///
/// Commands are ordered: load/stop first, then play/pause, then volume, then
/// playback rate. A volume change while muted produces nothing; toggling
/// mute produces `SetVolume(0.0)` or `SetVolume(next.volume)`.
pub fn reconcile(prev: &PlaybackState, next: &PlaybackState) -> Vec<BackendCommand> {
    let mut commands = Vec::new();

    if prev.resource != next.resource {
        match &next.resource {
            Some(resource) => commands.push(BackendCommand::Load(resource.clone())),
            None => commands.push(BackendCommand::Stop),
        }
    }

    match (prev.playing, next.playing) {
        (false, true) => commands.push(BackendCommand::Play),
        (true, false) => commands.push(BackendCommand::Pause),
        _ => {}
    }

    if prev.muted != next.muted {
        commands.push(BackendCommand::SetVolume(next.effective_volume()));
    } else if prev.volume != next.volume && !next.muted {
        commands.push(BackendCommand::SetVolume(next.volume));
    }

    if prev.playback_rate != next.playback_rate {
        commands.push(BackendCommand::SetPlaybackRate(next.playback_rate));
    }

    commands
}

//! # Playback Reconciliation Core
//!
//! A declarative control surface over heterogeneous, imperative media
//! backends. Callers describe the playback they want as a
//! [`PlaybackState`] snapshot; the player works out which backend can play
//! the resource, issues the imperative calls needed to get there, and
//! reports normalized lifecycle and progress events.
//!
//! ## Overview
//!
//! - [`traits`]: the capability interface backends implement
//!   ([`MediaBackend`], [`BackendFactory`], [`BackendEvents`])
//! - [`kinds`]: backend families and their URL recognition tables
//! - [`registry`]: ordered factory selection with a fallback
//! - [`reconcile`]: pure snapshot diffing into backend commands
//! - [`engine`]: readiness, pending seeks, first-start policy
//! - [`probe`] / [`progress`]: duration probing and progress sampling
//! - [`preload`]: warm instances for kinds likely to be needed next
//! - [`player`]: the actor that owns the engine and serves callers

pub mod config;
pub mod engine;
pub mod error;
pub mod instance;
pub mod kinds;
pub mod player;
pub mod preload;
pub mod probe;
pub mod progress;
pub mod reconcile;
pub mod registry;
pub mod state;
pub mod traits;

pub use config::PlayerConfig;
pub use engine::{PendingSeek, ReconciliationEngine};
pub use error::{PlaybackError, Result};
pub use instance::Readiness;
pub use kinds::BackendKind;
pub use player::{Player, PlayerStatus};
pub use reconcile::{reconcile, BackendCommand};
pub use registry::BackendRegistry;
pub use state::PlaybackState;
pub use traits::{
    BackendError, BackendEvent, BackendEventReceiver, BackendEventSender, BackendEvents,
    BackendFactory, BackendMessage, InstanceId, MediaBackend, SeekTarget,
};

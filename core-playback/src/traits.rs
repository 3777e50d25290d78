//! # Backend Capability Traits
//!
//! The seam across which concrete media backends (embedded hosts, local file
//! playback, streams) plug into the player. The core never depends on a
//! backend's internals, only on these traits.
//!
//! ## Architecture
//!
//! - **[`BackendFactory`]**: one per backend kind. Answers `can_handle`
//!   without creating anything and creates instances on demand.
//! - **[`MediaBackend`]**: one live instance. Receives imperative commands
//!   from the engine and answers progress/duration queries.
//! - **[`BackendEvents`]**: the callback handle an instance uses to report
//!   lifecycle transitions back to the engine. Each handle is bound to the
//!   instance id it was created for and stamps each event with the number
//!   of loads the instance has received. Callbacks from an instance that has
//!   been torn down, or left over from an earlier load, are recognised and
//!   dropped.
//!
//! ## Threading Model
//!
//! Instances are owned by the player's actor task and are only ever called
//! from that task, one call at a time. They must be `Send` so the task can
//! run on a multi-threaded runtime. [`BackendEvents`] is `Clone + Send` and
//! may be moved into SDK callbacks running on any thread.
//!
//! ## Example
//!
//! ```rust
//! use core_playback::{BackendEvents, BackendFactory, BackendKind, MediaBackend};
//!
//! struct SilentBackend {
//!     events: BackendEvents,
//! }
//!
//! impl MediaBackend for SilentBackend {
//!     fn load(&mut self, _resource: &str) {
//!         self.events.ready();
//!     }
//!     fn play(&mut self) {
//!         self.events.playback_started();
//!     }
//!     fn pause(&mut self) {
//!         self.events.paused();
//!     }
//!     fn stop(&mut self) {}
//!     fn seek_to(&mut self, _amount: f64) {}
//!     fn set_volume(&mut self, _volume: f64) {}
//!     fn set_playback_rate(&mut self, _rate: f64) {}
//!     fn duration(&self) -> Option<f64> {
//!         Some(60.0)
//!     }
//!     fn fraction_played(&self) -> Option<f64> {
//!         None
//!     }
//!     fn fraction_loaded(&self) -> Option<f64> {
//!         Some(1.0)
//!     }
//! }
//!
//! struct SilentFactory;
//!
//! impl BackendFactory for SilentFactory {
//!     fn kind(&self) -> BackendKind {
//!         BackendKind::File
//!     }
//!     fn create(&self, events: BackendEvents) -> Box<dyn MediaBackend> {
//!         Box::new(SilentBackend { events })
//!     }
//! }
//! ```

use crate::kinds::BackendKind;
use core_async::sync::mpsc;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

// ============================================================================
// Instance identity
// ============================================================================

/// Identifies one backend instance for the lifetime of a player.
///
/// Ids are never reused, which is what makes late callbacks detectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Lifecycle callbacks
// ============================================================================

/// Failure reported by a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The resource could not be prepared. The instance stays not-ready.
    #[error("failed to load resource: {0}")]
    Load(String),

    /// Playback failed after the resource was prepared.
    #[error("playback failed: {0}")]
    Playback(String),
}

/// Lifecycle transition reported by a backend instance.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// The instance can answer queries and accept seeks.
    Ready,
    /// Playback entered the playing state. Reported on every transition,
    /// not only the first.
    PlaybackStarted,
    Paused,
    Ended,
    Error(BackendError),
}

/// A lifecycle event as queued for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendMessage {
    pub instance: InstanceId,
    /// Number of `load` calls the instance had received when it emitted the
    /// event. `0` for events emitted while warming up.
    pub load: u64,
    pub event: BackendEvent,
}

/// Sending half of the engine's backend event queue.
pub type BackendEventSender = mpsc::UnboundedSender<BackendMessage>;

/// Receiving half of the engine's backend event queue.
pub type BackendEventReceiver = mpsc::UnboundedReceiver<BackendMessage>;

/// Callback handle given to a backend instance at creation.
///
/// Every call enqueues an event tagged with the instance id and the load it
/// belongs to. Calls never block and never fail; once the player is gone
/// they are silently dropped.
#[derive(Clone)]
pub struct BackendEvents {
    id: InstanceId,
    loads: Arc<AtomicU64>,
    tx: BackendEventSender,
}

impl BackendEvents {
    pub fn new(id: InstanceId, tx: BackendEventSender) -> Self {
        Self {
            id,
            loads: Arc::new(AtomicU64::new(0)),
            tx,
        }
    }

    /// Creates a handle bound to a fresh queue, for driving a backend
    /// outside a player.
    pub fn detached(id: InstanceId) -> (Self, BackendEventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(id, tx), rx)
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Number of `load` calls issued to the instance so far.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    /// Counts a new `load`. Shared by every clone of the handle, so events
    /// emitted from here on carry the new count.
    pub(crate) fn begin_load(&self) -> u64 {
        self.loads.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn ready(&self) {
        self.emit(BackendEvent::Ready);
    }

    pub fn playback_started(&self) {
        self.emit(BackendEvent::PlaybackStarted);
    }

    pub fn paused(&self) {
        self.emit(BackendEvent::Paused);
    }

    pub fn ended(&self) {
        self.emit(BackendEvent::Ended);
    }

    pub fn error(&self, error: BackendError) {
        self.emit(BackendEvent::Error(error));
    }

    pub fn emit(&self, event: BackendEvent) {
        let message = BackendMessage {
            instance: self.id,
            load: self.loads(),
            event,
        };
        if self.tx.send(message).is_err() {
            trace!(instance = %self.id, "player gone, dropping backend event");
        }
    }
}

impl fmt::Debug for BackendEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendEvents")
            .field("id", &self.id)
            .field("loads", &self.loads())
            .finish()
    }
}

// ============================================================================
// Seek targets
// ============================================================================

/// Interpretation of a seek amount.
///
/// Amounts strictly between 0 and 1 are a fraction of the duration; every
/// other amount is an absolute position in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    Fraction(f64),
    Seconds(f64),
}

impl SeekTarget {
    pub fn from_amount(amount: f64) -> Self {
        if amount > 0.0 && amount < 1.0 {
            SeekTarget::Fraction(amount)
        } else {
            SeekTarget::Seconds(amount)
        }
    }

    /// The raw amount, following the fraction/seconds convention.
    pub fn amount(self) -> f64 {
        match self {
            SeekTarget::Fraction(f) | SeekTarget::Seconds(f) => f,
        }
    }

    /// Absolute position in seconds, if it can be computed.
    ///
    /// A fraction needs a known, positive duration.
    pub fn to_seconds(self, duration: Option<f64>) -> Option<f64> {
        match self {
            SeekTarget::Seconds(seconds) => Some(seconds),
            SeekTarget::Fraction(fraction) => duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(|d| d * fraction),
        }
    }
}

// ============================================================================
// Core Traits
// ============================================================================

/// A live backend instance.
///
/// Command methods are fire-and-forget: they return immediately and the
/// backend reports the outcome through its [`BackendEvents`]. `play`,
/// `pause` and `stop` must be idempotent. `stop` releases the underlying
/// player; the instance is dropped right after.
///
/// Queries return `None` for "not known yet", never for an error.
pub trait MediaBackend: Send {
    /// Begin preparing `resource`. Report [`BackendEvent::Ready`] once on
    /// success, or [`BackendError::Load`] on failure.
    fn load(&mut self, resource: &str);

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    /// Seek by `amount`, interpreted as [`SeekTarget::from_amount`] does.
    /// The engine passes absolute seconds whenever the duration is known.
    fn seek_to(&mut self, amount: f64);

    fn set_volume(&mut self, volume: f64);

    fn set_playback_rate(&mut self, rate: f64);

    /// Duration in seconds.
    fn duration(&self) -> Option<f64>;

    /// Played position as a fraction of the duration.
    fn fraction_played(&self) -> Option<f64>;

    /// Buffered amount as a fraction of the duration.
    fn fraction_loaded(&self) -> Option<f64>;

    /// Warm up without a resource: fetch SDKs, create the embed, stay silent
    /// and invisible. Called on instances the preload manager keeps around.
    fn preload(&mut self) {}

    /// The raw third-party player object, for callers that need features
    /// the common interface does not cover.
    fn internal_handle(&self) -> Option<&dyn Any> {
        None
    }
}

/// Creates instances of one backend kind.
///
/// Registered once at startup and shared by reference.
pub trait BackendFactory: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Whether this kind can play `resource`. Pure; needs no instance.
    fn can_handle(&self, resource: &str) -> bool {
        self.kind().matches(resource)
    }

    /// Creates an idle instance that reports through `events`.
    fn create(&self, events: BackendEvents) -> Box<dyn MediaBackend>;
}

// ============================================================================
// Tests
// ============================================================================

//! # Player Event Bus
//!
//! Outbound events of a player, delivered over a tokio broadcast channel.
//!
//! ## Overview
//!
//! - **[`PlayerEvent`]**: the normalized lifecycle and progress events a
//!   caller observes, whatever backend produced them
//! - **[`EventBus`]**: broadcast channel the coordinator publishes on
//! - **[`EventStream`]**: receiver wrapper with optional filtering
//!
//! ```text
//! ┌─────────────┐  backend callbacks  ┌──────────────┐    emit    ┌──────────┐
//! │   Backend   ├────────────────────>│ Coordinator  ├───────────>│ EventBus │
//! └─────────────┘                     └──────────────┘            └────┬─────┘
//!                                                       subscribe      │
//!                                              ┌───────────────────────┤
//!                                              ▼                       ▼
//!                                        ┌────────────┐          ┌────────────┐
//!                                        │ Subscriber │          │ Subscriber │
//!                                        └────────────┘          └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, EventStream, PlayerEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut stream = EventStream::new(bus.subscribe())
//!     .filter(|event| !matches!(event, PlayerEvent::Progress(_)));
//!
//! bus.emit(PlayerEvent::Ready).ok();
//! assert_eq!(stream.recv().await.unwrap(), PlayerEvent::Ready);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal; progress events are the usual casualty.
//! - **`RecvError::Closed`**: the player was torn down.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Player Events
// ============================================================================

/// Normalized event emitted by a player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "payload")]
pub enum PlayerEvent {
    /// The active backend reported that it is ready.
    Ready,
    /// Playback began for the first time since the resource was loaded.
    Start,
    /// Playback started or resumed. Fires on every transition into playing.
    Play,
    /// Playback paused.
    Pause,
    /// The resource played to its end.
    Ended,
    /// The duration of the loaded resource became known. Fires once per load.
    Duration {
        /// Duration in seconds.
        seconds: f64,
    },
    /// Loaded/played progress changed.
    Progress(ProgressUpdate),
    /// A backend or the selector reported a failure.
    Error {
        kind: PlayerErrorKind,
        /// Human-readable error message.
        message: String,
        /// Whether loading again may succeed.
        recoverable: bool,
    },
}

impl PlayerEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            PlayerEvent::Ready => "Player ready",
            PlayerEvent::Start => "Playback started for the first time",
            PlayerEvent::Play => "Playback playing",
            PlayerEvent::Pause => "Playback paused",
            PlayerEvent::Ended => "Playback ended",
            PlayerEvent::Duration { .. } => "Duration available",
            PlayerEvent::Progress(_) => "Progress changed",
            PlayerEvent::Error { .. } => "Player error",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::Error { .. } => EventSeverity::Error,
            PlayerEvent::Ready | PlayerEvent::Start | PlayerEvent::Ended => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Kind of failure carried by [`PlayerEvent::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerErrorKind {
    /// The backend could not prepare the resource.
    LoadFailure,
    /// No registered backend, including the fallback, accepts the resource.
    UnsupportedResource,
    /// The backend failed after loading (decode, network, embed errors).
    Playback,
}

/// Progress fields that changed since the previous emitted update.
///
/// Absent fields did not change. The `*_seconds` fields are present only
/// when the duration is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub loaded: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub loaded_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub played: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub played_seconds: Option<f64>,
}

impl ProgressUpdate {
    /// Returns `true` if no field changed.
    pub fn is_empty(&self) -> bool {
        self.loaded.is_none() && self.played.is_none()
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel for [`PlayerEvent`]s.
///
/// Cloning the bus clones the sender; every [`subscribe`](Self::subscribe)
/// creates an independent receiver that sees events emitted after it was
/// created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// Subscribers falling behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none. Callers publishing fire-and-forget events
    /// ignore the error.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &PlayerEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` once the player is gone.
    pub async fn recv(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently queued.
    pub fn try_recv(&mut self) -> Option<Result<PlayerEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every queued matching event, skipping over lag notifications.
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! # Player
//!
//! Public facade over the reconciliation engine.
//!
//! [`Player::spawn`] moves the engine into one tokio task that handles, one
//! at a time, caller commands, backend lifecycle events and the engine's
//! timers. Nothing else touches the engine, so reconciliation of a snapshot
//! always completes before the next input is looked at, and backend events
//! are processed in the order they were queued.
//!
//! `Player` is a cheap, cloneable handle. The task stops, tearing down every
//! backend instance, when [`Player::shutdown`] is called, when the
//! cancellation token passed to [`Player::spawn_with_cancellation`] fires, or
//! when the last handle is dropped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{BackendRegistry, PlaybackState, Player, PlayerConfig};
//!
//! # async fn example(registry: BackendRegistry) -> core_playback::Result<()> {
//! let player = Player::spawn(registry, PlayerConfig::default())?;
//! let mut events = player.subscribe();
//!
//! player
//!     .set_state(
//!         PlaybackState::default()
//!             .with_resource("https://example.com/track.mp3")
//!             .with_playing(true),
//!     )
//!     .await?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{}", event.description());
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::PlayerConfig;
use crate::engine::ReconciliationEngine;
use crate::error::{PlaybackError, Result};
use crate::kinds::BackendKind;
use crate::registry::BackendRegistry;
use crate::state::PlaybackState;
use crate::traits::BackendEventReceiver;
use core_async::sync::{mpsc, oneshot, CancellationToken};
use core_async::task::spawn;
use core_async::time::{sleep_until_opt, Instant};
use core_runtime::events::{EventBus, EventStream};
use std::any::Any;
use std::fmt;
use tracing::{debug, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

/// Capacity of the caller command queue.
const COMMAND_BUFFER: usize = 32;

type HandleFn = Box<dyn FnOnce(Option<&dyn Any>) + Send>;

enum Command {
    SetState {
        state: PlaybackState,
        reply: oneshot::Sender<Result<()>>,
    },
    SeekTo {
        amount: f64,
        reply: oneshot::Sender<Option<f64>>,
    },
    Duration {
        reply: oneshot::Sender<Option<f64>>,
    },
    CurrentTime {
        reply: oneshot::Sender<Option<f64>>,
    },
    WithInternalHandle {
        f: HandleFn,
    },
    UpdateConfig {
        config: PlayerConfig,
        reply: oneshot::Sender<Result<()>>,
    },
    Status {
        reply: oneshot::Sender<PlayerStatus>,
    },
}

/// Point-in-time view of a player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    /// The last accepted snapshot.
    pub state: PlaybackState,
    pub active_kind: Option<BackendKind>,
    /// Whether the active instance has reported ready.
    pub ready: bool,
    pub warm_kinds: Vec<BackendKind>,
    pub has_pending_seek: bool,
}

/// Handle to a running player.
#[derive(Clone)]
pub struct Player {
    id: Uuid,
    commands: mpsc::Sender<Command>,
    events: EventBus,
    registry: BackendRegistry,
    cancel: CancellationToken,
}

impl Player {
    /// Spawns a player on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidConfig`] if `config` is invalid.
    pub fn spawn(registry: BackendRegistry, config: PlayerConfig) -> Result<Self> {
        Self::spawn_with_cancellation(registry, config, CancellationToken::new())
    }

    /// Like [`spawn`](Self::spawn), stopping when `cancel` fires.
    pub fn spawn_with_cancellation(
        registry: BackendRegistry,
        config: PlayerConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let id = Uuid::new_v4();
        let events = EventBus::new(config.event_buffer_size);
        let (backend_tx, backend_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        let span = info_span!("player", player_id = %id);
        let engine = span.in_scope(|| ReconciliationEngine::new(registry.clone(), config, backend_tx))?;

        spawn(
            run(engine, command_rx, backend_rx, events.clone(), cancel.clone()).instrument(span),
        );
        info!(player_id = %id, kinds = ?registry.kinds(), "Player started");

        Ok(Self {
            id,
            commands: command_tx,
            events,
            registry,
            cancel,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Submits a new desired state and waits until it has been reconciled.
    ///
    /// # Errors
    ///
    /// - Caller errors (`InvalidVolume`, `InvalidPlaybackRate`,
    ///   `InvalidProgressInterval`) leave the previous state in force.
    /// - [`PlaybackError::PlayerShutDown`] once the player has stopped.
    ///
    /// Backend failures are not returned here; they arrive as
    /// `PlayerEvent::Error`.
    pub async fn set_state(&self, state: PlaybackState) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetState { state, reply }).await?;
        rx.await.map_err(|_| PlaybackError::PlayerShutDown)?
    }

    /// Seeks by `amount` (fraction if strictly between 0 and 1, else
    /// seconds). Returns the target in seconds when it can be computed.
    pub async fn seek_to(&self, amount: f64) -> Option<f64> {
        self.query(|reply| Command::SeekTo { amount, reply })
            .await
            .flatten()
    }

    pub async fn duration(&self) -> Option<f64> {
        self.query(|reply| Command::Duration { reply }).await.flatten()
    }

    /// Played position in seconds, `None` if the fraction or the duration is
    /// unknown.
    pub async fn current_time(&self) -> Option<f64> {
        self.query(|reply| Command::CurrentTime { reply })
            .await
            .flatten()
    }

    /// Runs `f` against the active backend's raw player object.
    ///
    /// `f` runs on the player task and receives `None` when nothing is
    /// active or the backend exposes no handle. Returns `None` if the player
    /// has stopped.
    pub async fn with_internal_handle<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(Option<&dyn Any>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let f: HandleFn = Box::new(move |handle: Option<&dyn Any>| {
            reply.send(f(handle)).ok();
        });
        self.commands
            .send(Command::WithInternalHandle { f })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Replaces the configuration and re-evaluates the warm instances.
    pub async fn update_config(&self, config: PlayerConfig) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::UpdateConfig { config, reply }).await?;
        rx.await.map_err(|_| PlaybackError::PlayerShutDown)?
    }

    pub async fn status(&self) -> Option<PlayerStatus> {
        self.query(|reply| Command::Status { reply }).await
    }

    /// Subscribes to events emitted from now on.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Whether any registered backend, including the fallback, accepts
    /// `resource`. Creates nothing.
    pub fn can_play(&self, resource: &str) -> bool {
        self.registry.can_play_any(resource)
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Stops the player task and waits until every backend instance has been
    /// torn down. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.commands.closed().await;
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::PlayerShutDown)
    }

    async fn query<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(make(reply)).await.ok()?;
        rx.await.ok()
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .field("subscribers", &self.events.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Actor task
// ============================================================================

async fn run(
    mut engine: ReconciliationEngine,
    mut commands: mpsc::Receiver<Command>,
    mut backend_events: BackendEventReceiver,
    bus: EventBus,
    cancel: CancellationToken,
) {
    loop {
        let deadline = engine.next_deadline();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("Player cancelled");
                break;
            }
            Some(message) = backend_events.recv() => {
                engine.handle_backend_event(message, Instant::now());
            }
            command = commands.recv() => match command {
                Some(command) => handle_command(&mut engine, command, Instant::now()),
                None => {
                    debug!("All player handles dropped");
                    break;
                }
            },
            _ = sleep_until_opt(deadline) => {
                engine.on_timer(Instant::now());
            }
        }

        publish(&mut engine, &bus);
    }

    engine.teardown();
    publish(&mut engine, &bus);
    info!("Player stopped");
}

fn handle_command(engine: &mut ReconciliationEngine, command: Command, now: Instant) {
    match command {
        Command::SetState { state, reply } => {
            let result = engine.apply(state, now);
            log_rejection("state", &result);
            reply.send(result).ok();
        }
        Command::SeekTo { amount, reply } => {
            reply.send(engine.seek_to(amount, now)).ok();
        }
        Command::Duration { reply } => {
            reply.send(engine.duration()).ok();
        }
        Command::CurrentTime { reply } => {
            reply.send(engine.current_time()).ok();
        }
        Command::WithInternalHandle { f } => f(engine.internal_handle()),
        Command::UpdateConfig { config, reply } => {
            let result = engine.update_config(config);
            log_rejection("config", &result);
            reply.send(result).ok();
        }
        Command::Status { reply } => {
            reply
                .send(PlayerStatus {
                    state: engine.state().clone(),
                    active_kind: engine.active_kind().cloned(),
                    ready: engine.is_ready(),
                    warm_kinds: engine.warm_kinds(),
                    has_pending_seek: engine.pending_seek().is_some(),
                })
                .ok();
        }
    }
}

fn log_rejection(what: &str, result: &Result<()>) {
    match result {
        Err(error) if error.is_caller_error() => {
            debug!(error = %error, "Rejected {}", what);
        }
        Err(error) => warn!(error = %error, "Failed to apply {}", what),
        Ok(()) => {}
    }
}

fn publish(engine: &mut ReconciliationEngine, bus: &EventBus) {
    for event in engine.take_events() {
        if bus.emit(event).is_err() {
            trace!("No subscribers for player event");
        }
    }
}

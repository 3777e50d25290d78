//! # Reconciliation Engine
//!
//! Owns the active backend instance and converges it to the most recent
//! [`PlaybackState`]. It is synchronous and single-owner: every entry point
//! takes `&mut self` and an explicit `now`, and nothing inside it sleeps.
//! Timed work (duration probing, progress sampling, pending-seek expiry) is
//! exposed as a single [`next_deadline`](ReconciliationEngine::next_deadline)
//! that the driver waits for before calling
//! [`on_timer`](ReconciliationEngine::on_timer).
//!
//! ## Readiness protocol
//!
//! - `Loading`: `load` issued. Play requests are deferred, volume and rate
//!   are queued (latest value wins), non-zero seeks become a [`PendingSeek`].
//! - `Ready` (once per instance): queued volume/rate are flushed, a deferred
//!   play is issued if the caller still wants playback, the duration probe
//!   starts.
//! - First playback start after each load: rate and effective volume are
//!   applied, then `Start`, then `Play`, then any unexpired pending seek.
//!
//! Events from instances that are neither active nor warm are dropped, and
//! so are events the active instance emitted before its current `load`
//! (a Ready queued while it was warming up says nothing about the resource
//! it was promoted for).
//!
//! Caller-visible notifications accumulate in an outbox drained with
//! [`take_events`](ReconciliationEngine::take_events).

use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::instance::{BackendInstance, InstanceSpawner};
use crate::kinds::BackendKind;
use crate::preload::PreloadManager;
use crate::probe::DurationProbe;
use crate::progress::{ProgressReading, ProgressSampler};
use crate::reconcile::{reconcile, BackendCommand};
use crate::registry::BackendRegistry;
use crate::state::PlaybackState;
use crate::traits::{
    BackendError, BackendEvent, BackendEventSender, BackendMessage, InstanceId, SeekTarget,
};
use core_async::time::Instant;
use core_runtime::events::PlayerEvent;
use core_runtime::logging::redact_resource;
use std::any::Any;
use std::collections::VecDeque;
use tracing::{debug, info, trace, warn};

/// A seek requested before the active instance was ready.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSeek {
    pub target: SeekTarget,
    pub expires_at: Instant,
}

impl PendingSeek {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Volume and rate changes received while the instance was loading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct QueuedSettings {
    volume: Option<f64>,
    playback_rate: Option<f64>,
}

pub struct ReconciliationEngine {
    registry: BackendRegistry,
    config: PlayerConfig,
    state: PlaybackState,
    spawner: InstanceSpawner,
    active: Option<BackendInstance>,
    preload: PreloadManager,
    start_on_play: bool,
    deferred_play: bool,
    pending_seek: Option<PendingSeek>,
    queued: QueuedSettings,
    probe: DurationProbe,
    sampler: ProgressSampler,
    outbox: VecDeque<PlayerEvent>,
}

impl ReconciliationEngine {
    /// Creates an idle engine. Backends it creates report into `events`.
    ///
    /// Warm instances for the configured preload kinds are created right
    /// away, since nothing is active yet.
    pub fn new(
        registry: BackendRegistry,
        config: PlayerConfig,
        events: BackendEventSender,
    ) -> Result<Self> {
        config.validate()?;

        let state = PlaybackState::default();
        let mut engine = Self {
            probe: DurationProbe::new(config.duration_probe_interval),
            sampler: ProgressSampler::new(state.progress_interval),
            registry,
            config,
            state,
            spawner: InstanceSpawner::new(events),
            active: None,
            preload: PreloadManager::new(),
            start_on_play: true,
            deferred_play: false,
            pending_seek: None,
            queued: QueuedSettings::default(),
            outbox: VecDeque::new(),
        };
        engine.refresh_preload();
        Ok(engine)
    }

    // ========================================================================
    // State reconciliation
    // ========================================================================

    /// Converges the backend to `next`.
    ///
    /// Every command derived from the change is issued before this returns.
    /// An invalid snapshot is rejected as a whole and changes nothing.
    pub fn apply(&mut self, next: PlaybackState, now: Instant) -> Result<()> {
        next.validate()?;

        let commands = reconcile(&self.state, &next);
        let interval_changed = next.progress_interval != self.state.progress_interval;
        self.state = next;

        if interval_changed {
            self.sampler.set_interval(self.state.progress_interval);
            if self.sampler.is_running() {
                self.sampler.stop();
                self.sampler.start(now);
            }
        }

        let mut loaded = false;
        for command in commands {
            // A load already starts playback when the new state wants it.
            if loaded && command == BackendCommand::Play {
                continue;
            }
            loaded |= matches!(command, BackendCommand::Load(_));
            self.execute(command, now);
        }
        Ok(())
    }

    fn execute(&mut self, command: BackendCommand, now: Instant) {
        match command {
            BackendCommand::Load(resource) => self.load(&resource, now),
            BackendCommand::Stop => self.stop(),
            BackendCommand::Play => self.play(),
            BackendCommand::Pause => self.pause(),
            BackendCommand::SetVolume(volume) => self.set_volume(volume),
            BackendCommand::SetPlaybackRate(rate) => self.set_playback_rate(rate),
        }
    }

    fn load(&mut self, resource: &str, now: Instant) {
        self.pending_seek = None;
        self.start_on_play = true;
        self.deferred_play = false;
        self.queued = QueuedSettings::default();
        self.probe.reset();
        self.sampler.reset_snapshot();

        let Some(factory) = self.registry.select(resource).cloned() else {
            let redacted = redact_resource(resource);
            warn!(resource = %redacted, "No backend can play resource");
            self.release_active();
            self.sampler.stop();
            self.report(PlaybackError::UnsupportedResource(redacted));
            self.refresh_preload();
            return;
        };

        let kind = factory.kind();
        let reuse = self
            .active
            .as_ref()
            .is_some_and(|active| active.kind() == &kind);

        if !reuse {
            // The previous instance is gone before the next one loads.
            self.release_active();
            let instance = match self.preload.take(&kind) {
                Some(instance) => {
                    info!(instance = %instance.id(), kind = %kind, "Promoting warm instance");
                    instance
                }
                None => {
                    let instance = self.spawner.spawn(factory.as_ref());
                    info!(instance = %instance.id(), kind = %kind, "Backend instance created");
                    instance
                }
            };
            self.active = Some(instance);
        }

        let playing = self.state.playing;
        if let Some(active) = self.active.as_mut() {
            debug!(
                instance = %active.id(),
                resource = %redact_resource(resource),
                "load"
            );
            active.load(resource);

            if playing {
                if active.is_ready() {
                    debug!(instance = %active.id(), "play");
                    active.backend_mut().play();
                } else {
                    self.deferred_play = true;
                }
            }
        }

        self.sampler.start(now);
        self.refresh_preload();
    }

    fn stop(&mut self) {
        self.release_active();
        self.pending_seek = None;
        self.deferred_play = false;
        self.queued = QueuedSettings::default();
        self.probe.reset();
        self.sampler.stop();
        self.sampler.reset_snapshot();
        self.refresh_preload();
    }

    fn play(&mut self) {
        match self.active.as_mut() {
            Some(active) if active.is_ready() => {
                debug!(instance = %active.id(), "play");
                active.backend_mut().play();
            }
            Some(active) => {
                debug!(instance = %active.id(), "Deferring play until ready");
                self.deferred_play = true;
            }
            None => {}
        }
    }

    fn pause(&mut self) {
        match self.active.as_mut() {
            Some(active) if active.is_ready() => {
                debug!(instance = %active.id(), "pause");
                active.backend_mut().pause();
            }
            _ => self.deferred_play = false,
        }
    }

    fn set_volume(&mut self, volume: f64) {
        match self.active.as_mut() {
            Some(active) if active.is_ready() => {
                debug!(instance = %active.id(), volume, "set_volume");
                active.backend_mut().set_volume(volume);
            }
            Some(_) => self.queued.volume = Some(volume),
            None => {}
        }
    }

    fn set_playback_rate(&mut self, rate: f64) {
        match self.active.as_mut() {
            Some(active) if active.is_ready() => {
                debug!(instance = %active.id(), rate, "set_playback_rate");
                active.backend_mut().set_playback_rate(rate);
            }
            Some(_) => self.queued.playback_rate = Some(rate),
            None => {}
        }
    }

    // ========================================================================
    // Seeking
    // ========================================================================

    /// Seeks by `amount`: a fraction of the duration if strictly between 0
    /// and 1, otherwise seconds.
    ///
    /// Before readiness a non-zero amount is recorded as a [`PendingSeek`]
    /// and applied on the first playback start; `0` is always applied
    /// immediately. Returns the target in seconds when it can be computed,
    /// `None` with nothing loaded.
    pub fn seek_to(&mut self, amount: f64, now: Instant) -> Option<f64> {
        let target = SeekTarget::from_amount(amount);
        let expiry = self.config.pending_seek_expiry;
        let active = self.active.as_mut()?;
        let seconds = target.to_seconds(active.backend().duration());

        if !active.is_ready() && amount != 0.0 {
            debug!(instance = %active.id(), amount, "Recording seek until ready");
            self.pending_seek = Some(PendingSeek {
                target,
                expires_at: now + expiry,
            });
            return seconds;
        }

        debug!(instance = %active.id(), amount, ?seconds, "seek_to");
        active.backend_mut().seek_to(seconds.unwrap_or(amount));
        self.pending_seek = None;
        seconds
    }

    fn apply_pending_seek(&mut self, now: Instant) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if !active.is_ready() {
            return;
        }
        let Some(pending) = self.pending_seek.take() else {
            return;
        };
        if pending.is_expired(now) {
            debug!(instance = %active.id(), "Discarding expired pending seek");
            return;
        }

        let duration = active.backend().duration();
        let amount = pending
            .target
            .to_seconds(duration)
            .unwrap_or_else(|| pending.target.amount());
        debug!(instance = %active.id(), amount, "Applying pending seek");
        active.backend_mut().seek_to(amount);
    }

    // ========================================================================
    // Backend lifecycle events
    // ========================================================================

    /// Processes one lifecycle event in the order the backend emitted it.
    pub fn handle_backend_event(&mut self, message: BackendMessage, now: Instant) {
        let id = message.instance;
        let current = match self.active.as_ref() {
            Some(active) if active.id() == id => active.is_current(&message),
            _ => {
                if !self.preload.handle_event(id, &message.event) {
                    trace!(instance = %id, event = ?message.event, "Dropping event from torn-down instance");
                }
                return;
            }
        };

        if !current {
            trace!(
                instance = %id,
                load = message.load,
                event = ?message.event,
                "Dropping event from an earlier load"
            );
            return;
        }

        match message.event {
            BackendEvent::Ready => self.on_ready(now),
            BackendEvent::PlaybackStarted => self.on_playback_started(now),
            BackendEvent::Paused => self.emit(PlayerEvent::Pause),
            BackendEvent::Ended => self.emit(PlayerEvent::Ended),
            BackendEvent::Error(error) => self.on_error(error),
        }
    }

    fn on_ready(&mut self, now: Instant) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        if active.mark_ready() {
            info!(instance = %active.id(), kind = %active.kind(), "Backend ready");
            if let Some(rate) = self.queued.playback_rate.take() {
                debug!(instance = %active.id(), rate, "set_playback_rate (queued)");
                active.backend_mut().set_playback_rate(rate);
            }
            if let Some(volume) = self.queued.volume.take() {
                debug!(instance = %active.id(), volume, "set_volume (queued)");
                active.backend_mut().set_volume(volume);
            }
        }

        if std::mem::take(&mut self.deferred_play) && self.state.playing {
            debug!(instance = %active.id(), "play");
            active.backend_mut().play();
        }

        self.emit(PlayerEvent::Ready);
        self.probe.start(now);
        self.run_probe(now);
    }

    fn on_playback_started(&mut self, now: Instant) {
        if self.start_on_play {
            let rate = self.state.playback_rate;
            let volume = self.state.effective_volume();
            if let Some(active) = self.active.as_mut() {
                debug!(instance = %active.id(), rate, volume, "Applying audio state on first start");
                active.backend_mut().set_playback_rate(rate);
                active.backend_mut().set_volume(volume);
            }
            self.start_on_play = false;
            self.queued = QueuedSettings::default();
            self.emit(PlayerEvent::Start);
        }

        self.emit(PlayerEvent::Play);
        self.apply_pending_seek(now);
        self.probe.start(now);
        self.run_probe(now);
    }

    fn on_error(&mut self, error: BackendError) {
        if let Some(active) = self.active.as_ref() {
            warn!(instance = %active.id(), error = %error, "Backend reported an error");
        }

        let error = PlaybackError::from(error);
        if matches!(error, PlaybackError::LoadFailure(_)) {
            self.deferred_play = false;
        }
        self.report(error);
    }

    /// Surfaces `error` as a `PlayerEvent::Error`. Load failures are
    /// recoverable: a later snapshot may load fine.
    fn report(&mut self, error: PlaybackError) {
        let Some(kind) = error.event_kind() else {
            warn!(error = %error, "Error has no event form");
            return;
        };
        self.emit(PlayerEvent::Error {
            kind,
            message: error.to_string(),
            recoverable: error.is_transient(),
        });
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// The earliest instant at which [`on_timer`](Self::on_timer) has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.probe.deadline(),
            self.sampler.deadline(),
            self.pending_seek.map(|pending| pending.expires_at),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Runs whatever timed work is due at `now`.
    pub fn on_timer(&mut self, now: Instant) {
        if self
            .pending_seek
            .is_some_and(|pending| pending.is_expired(now))
        {
            debug!("Pending seek expired");
            self.pending_seek = None;
        }

        if self.probe.is_due(now) {
            self.run_probe(now);
        }

        if self.sampler.is_due(now) {
            self.sample_progress(now);
        }
    }

    fn run_probe(&mut self, now: Instant) {
        let Some(active) = self.active.as_ref() else {
            self.probe.cancel();
            return;
        };

        let duration = active.backend().duration();
        if let Some(seconds) = self.probe.check(duration, now) {
            info!(instance = %active.id(), seconds, "Duration available");
            self.emit(PlayerEvent::Duration { seconds });
        }
    }

    fn sample_progress(&mut self, now: Instant) {
        let reading = match (&self.state.resource, self.active.as_ref()) {
            (Some(_), Some(active)) => {
                let backend = active.backend();
                ProgressReading {
                    loaded: backend.fraction_loaded(),
                    played: backend.fraction_played(),
                    duration: backend.duration(),
                }
            }
            _ => {
                self.sampler.stop();
                return;
            }
        };

        match self.sampler.tick(reading, now) {
            Some(update) => self.emit(PlayerEvent::Progress(update)),
            None => trace!("Progress unchanged"),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Duration of the active resource in seconds, if known.
    pub fn duration(&self) -> Option<f64> {
        self.active.as_ref()?.backend().duration()
    }

    /// Played position in seconds: played fraction × duration.
    pub fn current_time(&self) -> Option<f64> {
        let backend = self.active.as_ref()?.backend();
        let duration = backend.duration()?;
        let played = backend.fraction_played()?;
        Some(played * duration)
    }

    /// The active backend's raw player object.
    pub fn internal_handle(&self) -> Option<&dyn Any> {
        self.active.as_ref()?.backend().internal_handle()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn active_kind(&self) -> Option<&BackendKind> {
        self.active.as_ref().map(|active| active.kind())
    }

    pub fn active_id(&self) -> Option<InstanceId> {
        self.active.as_ref().map(|active| active.id())
    }

    pub fn is_ready(&self) -> bool {
        self.active.as_ref().is_some_and(|active| active.is_ready())
    }

    pub fn pending_seek(&self) -> Option<PendingSeek> {
        self.pending_seek
    }

    pub fn warm_kinds(&self) -> Vec<BackendKind> {
        self.preload.kinds()
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    // ========================================================================
    // Configuration & teardown
    // ========================================================================

    /// Replaces the configuration and re-evaluates the warm set. A new
    /// pending-seek expiry applies to seeks recorded from now on.
    pub fn update_config(&mut self, config: PlayerConfig) -> Result<()> {
        config.validate()?;
        self.probe.set_interval(config.duration_probe_interval);
        self.config = config;
        self.refresh_preload();
        Ok(())
    }

    /// Tears down the active and all warm instances and cancels every timer.
    pub fn teardown(&mut self) {
        info!("Tearing down reconciliation engine");
        self.release_active();
        self.preload.teardown_all();
        self.pending_seek = None;
        self.deferred_play = false;
        self.probe.reset();
        self.sampler.stop();
    }

    /// Drains the notifications produced since the last call.
    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        self.outbox.drain(..).collect()
    }

    fn release_active(&mut self) {
        if let Some(instance) = self.active.take() {
            instance.teardown();
        }
        self.probe.cancel();
    }

    fn refresh_preload(&mut self) {
        let active_kind = self.active.as_ref().map(|active| active.kind().clone());
        self.preload.evaluate(
            &self.config.preload,
            active_kind.as_ref(),
            self.state.resource.as_deref(),
            &self.registry,
            &mut self.spawner,
        );
    }

    fn emit(&mut self, event: PlayerEvent) {
        trace!(event = event.description(), "Queueing player event");
        self.outbox.push_back(event);
    }
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("state", &self.state)
            .field("active", &self.active)
            .field("warm", &self.preload.kinds())
            .field("pending_seek", &self.pending_seek)
            .finish()
    }
}

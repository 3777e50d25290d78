//! Recording mock backends shared by the integration tests.

#![allow(dead_code)]

use core_playback::{
    BackendError, BackendEvents, BackendFactory, BackendKind, BackendRegistry, InstanceId,
    MediaBackend,
};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const YOUTUBE_URL: &str = "https://www.youtube.com/watch?v=oUFJJNQGwhk";
pub const YOUTUBE_URL_2: &str = "https://youtu.be/M7lc1UVf-VE";
pub const VIMEO_URL: &str = "https://vimeo.com/90509568";
pub const FILE_URL: &str = "https://example.com/media/track.mp3";
pub const FILE_URL_2: &str = "https://example.com/media/other.webm";

/// An imperative call received by a mock backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(String),
    Play,
    Pause,
    Stop,
    SeekTo(f64),
    SetVolume(f64),
    SetPlaybackRate(f64),
    Preload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub kind: BackendKind,
    pub instance: InstanceId,
    pub call: Call,
}

/// The object returned from `internal_handle`.
#[derive(Debug, PartialEq)]
pub struct InternalPlayer {
    pub instance: u64,
}

/// Shared state behind every mock instance: the call log, the scripted query
/// answers and the event handles given to each instance.
pub struct MockHub {
    calls: Mutex<Vec<Recorded>>,
    handles: Mutex<Vec<(BackendKind, BackendEvents)>>,
    duration: Mutex<Option<f64>>,
    duration_script: Mutex<VecDeque<Option<f64>>>,
    loaded: Mutex<Option<f64>>,
    played: Mutex<Option<f64>>,
    auto_ready: AtomicBool,
    auto_start: AtomicBool,
    fail_load: AtomicBool,
}

impl MockHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
            duration: Mutex::new(None),
            duration_script: Mutex::new(VecDeque::new()),
            loaded: Mutex::new(None),
            played: Mutex::new(None),
            auto_ready: AtomicBool::new(true),
            auto_start: AtomicBool::new(true),
            fail_load: AtomicBool::new(false),
        })
    }

    /// Report ready from inside `load`.
    pub fn set_auto_ready(&self, enabled: bool) {
        self.auto_ready.store(enabled, Ordering::SeqCst);
    }

    /// Report playback started/paused from inside `play`/`pause`.
    pub fn set_auto_start(&self, enabled: bool) {
        self.auto_start.store(enabled, Ordering::SeqCst);
    }

    pub fn set_fail_load(&self, enabled: bool) {
        self.fail_load.store(enabled, Ordering::SeqCst);
    }

    pub fn set_duration(&self, duration: Option<f64>) {
        *self.duration.lock() = duration;
    }

    /// Answers for the next `duration()` queries, before falling back to
    /// the value set with `set_duration`.
    pub fn script_durations(&self, readings: impl IntoIterator<Item = Option<f64>>) {
        self.duration_script.lock().extend(readings);
    }

    pub fn set_fractions(&self, loaded: Option<f64>, played: Option<f64>) {
        *self.loaded.lock() = loaded;
        *self.played.lock() = played;
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, instance: InstanceId) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|recorded| recorded.instance == instance)
            .map(|recorded| recorded.call.clone())
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|recorded| predicate(&recorded.call))
            .count()
    }

    pub fn position(&self, instance: InstanceId, call: &Call) -> Option<usize> {
        self.calls
            .lock()
            .iter()
            .position(|recorded| recorded.instance == instance && &recorded.call == call)
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Number of instances created so far.
    pub fn created(&self) -> usize {
        self.handles.lock().len()
    }

    /// Event handle of the most recently created instance of `kind`.
    pub fn events_of(&self, kind: &BackendKind) -> Option<BackendEvents> {
        self.handles
            .lock()
            .iter()
            .rev()
            .find(|(k, _)| k == kind)
            .map(|(_, events)| events.clone())
    }

    pub fn events_for(&self, instance: InstanceId) -> Option<BackendEvents> {
        self.handles
            .lock()
            .iter()
            .find(|(_, events)| events.id() == instance)
            .map(|(_, events)| events.clone())
    }

    pub fn instance_ids(&self, kind: &BackendKind) -> Vec<InstanceId> {
        self.handles
            .lock()
            .iter()
            .filter(|(k, _)| k == kind)
            .map(|(_, events)| events.id())
            .collect()
    }

    fn record(&self, kind: &BackendKind, instance: InstanceId, call: Call) {
        self.calls.lock().push(Recorded {
            kind: kind.clone(),
            instance,
            call,
        });
    }

    fn duration(&self) -> Option<f64> {
        match self.duration_script.lock().pop_front() {
            Some(reading) => reading,
            None => *self.duration.lock(),
        }
    }
}

pub struct MockBackend {
    kind: BackendKind,
    events: BackendEvents,
    hub: Arc<MockHub>,
    internal: InternalPlayer,
}

impl MockBackend {
    fn record(&self, call: Call) {
        self.hub.record(&self.kind, self.events.id(), call);
    }
}

impl MediaBackend for MockBackend {
    fn load(&mut self, resource: &str) {
        self.record(Call::Load(resource.to_string()));
        if self.hub.fail_load.load(Ordering::SeqCst) {
            self.events
                .error(BackendError::Load(format!("cannot open {}", resource)));
        } else if self.hub.auto_ready.load(Ordering::SeqCst) {
            self.events.ready();
        }
    }

    fn play(&mut self) {
        self.record(Call::Play);
        if self.hub.auto_start.load(Ordering::SeqCst) {
            self.events.playback_started();
        }
    }

    fn pause(&mut self) {
        self.record(Call::Pause);
        if self.hub.auto_start.load(Ordering::SeqCst) {
            self.events.paused();
        }
    }

    fn stop(&mut self) {
        self.record(Call::Stop);
    }

    fn seek_to(&mut self, amount: f64) {
        self.record(Call::SeekTo(amount));
    }

    fn set_volume(&mut self, volume: f64) {
        self.record(Call::SetVolume(volume));
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.record(Call::SetPlaybackRate(rate));
    }

    fn duration(&self) -> Option<f64> {
        self.hub.duration()
    }

    fn fraction_played(&self) -> Option<f64> {
        *self.hub.played.lock()
    }

    fn fraction_loaded(&self) -> Option<f64> {
        *self.hub.loaded.lock()
    }

    fn preload(&mut self) {
        self.record(Call::Preload);
    }

    fn internal_handle(&self) -> Option<&dyn Any> {
        Some(&self.internal)
    }
}

pub struct MockFactory {
    kind: BackendKind,
    hub: Arc<MockHub>,
    accept_all: bool,
}

impl MockFactory {
    pub fn new(kind: BackendKind, hub: &Arc<MockHub>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            hub: Arc::clone(hub),
            accept_all: false,
        })
    }

    /// A fallback that accepts any resource.
    pub fn accepting_all(kind: BackendKind, hub: &Arc<MockHub>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            hub: Arc::clone(hub),
            accept_all: true,
        })
    }
}

impl BackendFactory for MockFactory {
    fn kind(&self) -> BackendKind {
        self.kind.clone()
    }

    fn can_handle(&self, resource: &str) -> bool {
        self.accept_all || self.kind.matches(resource)
    }

    fn create(&self, events: BackendEvents) -> Box<dyn MediaBackend> {
        self.hub
            .handles
            .lock()
            .push((self.kind.clone(), events.clone()));
        Box::new(MockBackend {
            kind: self.kind.clone(),
            internal: InternalPlayer {
                instance: events.id().as_u64(),
            },
            events,
            hub: Arc::clone(&self.hub),
        })
    }
}

/// YouTube, Vimeo and DailyMotion in that order, with an accept-all `File`
/// fallback.
pub fn registry(hub: &Arc<MockHub>) -> BackendRegistry {
    BackendRegistry::new()
        .register(MockFactory::new(BackendKind::YouTube, hub))
        .register(MockFactory::new(BackendKind::Vimeo, hub))
        .register(MockFactory::new(BackendKind::DailyMotion, hub))
        .with_fallback(MockFactory::accepting_all(BackendKind::File, hub))
}

/// Same kinds, but the `File` fallback only accepts media file URLs.
pub fn strict_registry(hub: &Arc<MockHub>) -> BackendRegistry {
    BackendRegistry::new()
        .register(MockFactory::new(BackendKind::YouTube, hub))
        .register(MockFactory::new(BackendKind::Vimeo, hub))
        .with_fallback(MockFactory::new(BackendKind::File, hub))
}

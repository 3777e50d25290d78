//! # Backend Instances
//!
//! A created backend together with its identity and readiness. Instances are
//! exclusively owned: by the engine while active, by the preload manager
//! while warm.

use crate::kinds::BackendKind;
use crate::traits::{
    BackendEventSender, BackendEvents, BackendFactory, BackendMessage, InstanceId, MediaBackend,
};
use std::fmt;
use tracing::{debug, info};

/// Readiness of one instance. Moves to `Ready` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Loading,
    Ready,
}

pub struct BackendInstance {
    id: InstanceId,
    kind: BackendKind,
    readiness: Readiness,
    events: BackendEvents,
    backend: Box<dyn MediaBackend>,
}

impl BackendInstance {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn kind(&self) -> &BackendKind {
        &self.kind
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    /// Marks the instance ready. Returns `true` on the first transition only.
    pub fn mark_ready(&mut self) -> bool {
        let first = self.readiness == Readiness::Loading;
        self.readiness = Readiness::Ready;
        first
    }

    /// Hands `resource` to the backend. Events it emitted before this call
    /// no longer count as current.
    pub fn load(&mut self, resource: &str) {
        self.events.begin_load();
        self.backend.load(resource);
    }

    /// Number of loads issued to this instance.
    pub fn load_count(&self) -> u64 {
        self.events.loads()
    }

    /// Whether `message` was emitted by this instance for its current load.
    pub fn is_current(&self, message: &BackendMessage) -> bool {
        message.instance == self.id && message.load == self.load_count()
    }

    pub fn backend(&self) -> &dyn MediaBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn MediaBackend {
        self.backend.as_mut()
    }

    /// Stops the backend and drops it. Events it queued afterwards carry an
    /// id nobody owns any more and are discarded by the engine.
    pub fn teardown(mut self) {
        info!(instance = %self.id, kind = %self.kind, "Tearing down backend instance");
        self.backend.stop();
    }
}

impl fmt::Debug for BackendInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendInstance")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("readiness", &self.readiness)
            .field("loads", &self.load_count())
            .finish()
    }
}

/// Creates instances with fresh ids, all reporting into one event queue.
#[derive(Debug)]
pub struct InstanceSpawner {
    next_id: u64,
    tx: BackendEventSender,
}

impl InstanceSpawner {
    pub fn new(tx: BackendEventSender) -> Self {
        Self { next_id: 1, tx }
    }

    pub fn spawn(&mut self, factory: &dyn BackendFactory) -> BackendInstance {
        let id = InstanceId::new(self.next_id);
        self.next_id += 1;

        let kind = factory.kind();
        debug!(instance = %id, kind = %kind, "Creating backend instance");
        let events = BackendEvents::new(id, self.tx.clone());
        let backend = factory.create(events.clone());

        BackendInstance {
            id,
            kind,
            readiness: Readiness::Loading,
            events,
            backend,
        }
    }
}

//! # Preload Manager
//!
//! Keeps warm, silent instances of the backend kinds flagged for preloading,
//! so switching to one of them skips the cold start. A kind is kept warm only
//! while it cannot handle the active resource; the engine never issues
//! playback calls to a warm instance until it is promoted with
//! [`PreloadManager::take`].

use crate::instance::{BackendInstance, InstanceSpawner};
use crate::kinds::BackendKind;
use crate::registry::BackendRegistry;
use crate::traits::{BackendEvent, InstanceId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Default)]
pub struct PreloadManager {
    warm: BTreeMap<BackendKind, BackendInstance>,
}

impl PreloadManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the warm set in line with `wanted` and the active resource.
    ///
    /// Instances that are no longer eligible are torn down; eligible kinds
    /// without an instance get one. Instances that stay eligible are kept.
    pub fn evaluate(
        &mut self,
        wanted: &BTreeSet<BackendKind>,
        active_kind: Option<&BackendKind>,
        active_resource: Option<&str>,
        registry: &BackendRegistry,
        spawner: &mut InstanceSpawner,
    ) {
        let eligible: BTreeSet<BackendKind> = wanted
            .iter()
            .filter(|kind| Some(*kind) != active_kind)
            .filter(|kind| match registry.factory_for(kind) {
                Some(factory) => !active_resource.is_some_and(|r| factory.can_handle(r)),
                None => {
                    warn!(kind = %kind, "Preload requested for unregistered backend kind");
                    false
                }
            })
            .cloned()
            .collect();

        let stale: Vec<BackendKind> = self
            .warm
            .keys()
            .filter(|kind| !eligible.contains(*kind))
            .cloned()
            .collect();
        for kind in stale {
            if let Some(instance) = self.warm.remove(&kind) {
                instance.teardown();
            }
        }

        for kind in eligible {
            if self.warm.contains_key(&kind) {
                continue;
            }
            if let Some(factory) = registry.factory_for(&kind) {
                let mut instance = spawner.spawn(factory.as_ref());
                instance.backend_mut().preload();
                info!(instance = %instance.id(), kind = %kind, "Warm instance created");
                self.warm.insert(kind, instance);
            }
        }
    }

    /// Removes the warm instance of `kind` for promotion to active.
    pub fn take(&mut self, kind: &BackendKind) -> Option<BackendInstance> {
        self.warm.remove(kind)
    }

    /// Records a lifecycle event from a warm instance.
    ///
    /// Returns `false` if `id` is not a warm instance.
    pub fn handle_event(&mut self, id: InstanceId, event: &BackendEvent) -> bool {
        let Some(instance) = self.warm.values_mut().find(|instance| instance.id() == id) else {
            return false;
        };

        match event {
            BackendEvent::Ready => {
                if instance.mark_ready() {
                    debug!(instance = %id, kind = %instance.kind(), "Warm instance ready");
                }
            }
            BackendEvent::Error(error) => {
                warn!(instance = %id, kind = %instance.kind(), error = %error, "Warm instance reported an error");
            }
            other => {
                trace!(instance = %id, event = ?other, "Ignoring playback event from warm instance");
            }
        }
        true
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        self.warm.keys().cloned().collect()
    }

    pub fn teardown_all(&mut self) {
        for (_, instance) in std::mem::take(&mut self.warm) {
            instance.teardown();
        }
    }
}

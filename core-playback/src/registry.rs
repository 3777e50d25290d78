//! # Backend Registry
//!
//! Immutable, ordered list of backend factories built once at startup and
//! shared by reference. Selection walks the list in registration order and
//! falls back to a designated generic backend.

use crate::kinds::BackendKind;
use crate::traits::BackendFactory;
use std::fmt;
use std::sync::Arc;

/// Ordered set of backend factories plus a fallback.
#[derive(Clone)]
pub struct BackendRegistry {
    factories: Vec<Arc<dyn BackendFactory>>,
    fallback: Option<Arc<dyn BackendFactory>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
            fallback: None,
        }
    }

    /// Appends a factory. Earlier registrations win when several accept the
    /// same resource.
    pub fn register(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Sets the factory used when no registered one accepts a resource.
    pub fn with_fallback(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        self.fallback = Some(factory);
        self
    }

    /// Returns the first factory that accepts `resource`, else the fallback
    /// if it accepts it. `None` means the resource is unsupported.
    pub fn select(&self, resource: &str) -> Option<&Arc<dyn BackendFactory>> {
        self.factories
            .iter()
            .find(|factory| factory.can_handle(resource))
            .or_else(|| {
                self.fallback
                    .as_ref()
                    .filter(|fallback| fallback.can_handle(resource))
            })
    }

    /// Returns `true` if any registered factory, including the fallback,
    /// accepts `resource`. Creates nothing.
    pub fn can_play_any(&self, resource: &str) -> bool {
        self.select(resource).is_some()
    }

    /// Looks up the factory registered for `kind`.
    pub fn factory_for(&self, kind: &BackendKind) -> Option<&Arc<dyn BackendFactory>> {
        self.factories
            .iter()
            .chain(self.fallback.iter())
            .find(|factory| &factory.kind() == kind)
    }

    /// Kinds in registration order, fallback last.
    pub fn kinds(&self) -> Vec<BackendKind> {
        self.factories
            .iter()
            .chain(self.fallback.iter())
            .map(|factory| factory.kind())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty() && self.fallback.is_none()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("kinds", &self.kinds())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

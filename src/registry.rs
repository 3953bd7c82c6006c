//! Backend registration.
//!
//! Exactly one backend is active at a time. Registering a new one hands the
//! previous one back so callers can chain them if they want to.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::FrontswapBackend;
use crate::types::{FrontswapError, Result};

/// Shared, immutable-after-publish backend handle
pub type BackendRef = Arc<dyn FrontswapBackend>;

pub struct Registry {
    active: RwLock<Option<BackendRef>>,

    /// Set by the first registration, never cleared
    enabled: AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
            enabled: AtomicBool::new(false),
        }
    }

    /// Publish `backend`, returning whatever was active before
    pub fn register(&self, backend: BackendRef) -> Option<BackendRef> {
        let previous = self.active.write().replace(backend);
        self.enabled.store(true, Ordering::Release);
        previous
    }

    /// Snapshot of the active backend
    ///
    /// The clone keeps the backend alive across a concurrent re-registration,
    /// so callers never hold the registry lock while inside a backend.
    pub fn current(&self) -> Result<BackendRef> {
        self.active
            .read()
            .as_ref()
            .cloned()
            .ok_or(FrontswapError::NoBackend)
    }

    /// Whether the paging path should consult the cache at all
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("enabled", &self.is_enabled())
            .field("registered", &self.active.read().is_some())
            .finish()
    }
}

// crates/workloom-router/src/registry.rs
// ============================================================================
// Module: Backend Registry
// Description: Generic id-to-runtime registry with duplicate rejection.
// Purpose: Hold registered backends for one resource kind.
// Dependencies: workloom-core
// ============================================================================

//! ## Overview
//! A registry maps a backend identifier to a shared runtime handle. The same
//! generic shape backs all three router instantiations; the runtime type
//! parameter is the per-kind backend trait object. Registration rejects
//! duplicate identifiers; lookups are cheap clones of `Arc` handles.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use workloom_core::BackendId;

use crate::router::RouteError;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry of backends for one resource kind.
///
/// # Invariants
/// - Backend identifiers are unique within the registry.
/// - The registry is immutable once handed to a router.
pub struct BackendRegistry<R: ?Sized> {
    /// Runtime handles keyed by backend identifier.
    backends: BTreeMap<BackendId, Arc<R>>,
}

impl<R: ?Sized> BackendRegistry<R> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            backends: BTreeMap::new(),
        }
    }

    /// Registers a runtime under the provided identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::DuplicateBackend`] when the identifier is
    /// already registered.
    pub fn register(&mut self, id: BackendId, runtime: Arc<R>) -> Result<(), RouteError> {
        if self.backends.contains_key(&id) {
            return Err(RouteError::DuplicateBackend {
                backend_id: id,
            });
        }
        self.backends.insert(id, runtime);
        Ok(())
    }

    /// Returns the runtime registered under the identifier, if any.
    #[must_use]
    pub fn get(&self, id: &BackendId) -> Option<Arc<R>> {
        self.backends.get(id).map(Arc::clone)
    }

    /// Returns true when the identifier is registered.
    #[must_use]
    pub fn contains(&self, id: &BackendId) -> bool {
        self.backends.contains_key(id)
    }

    /// Returns the registered identifiers in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<BackendId> {
        self.backends.keys().cloned().collect()
    }
}

impl<R: ?Sized> Default for BackendRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

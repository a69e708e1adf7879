// crates/workloom-router/src/router.rs
// ============================================================================
// Module: Backend Router
// Description: Candidate-list resolution with first-success-wins routing.
// Purpose: Route calls across registered backends with profile fallback.
// Dependencies: workloom-core
// ============================================================================

//! ## Overview
//! A router owns a registry and a per-kind configuration. For every call it
//! builds an ordered candidate list: the explicit backend id (when given),
//! then the resolved profile's configured ids, then the global fallback
//! list, deduplicated in first-seen order. The walk skips unregistered ids
//! and ids whose availability probe fails; probes run on every attempt and
//! are never cached.
//!
//! Text and embedding calls are naturally retryable: a thrown attempt is
//! counted and the walk continues. Harness execution still walks the list
//! for lookup and availability, but an execution error from the attempted
//! backend propagates immediately; side-effecting calls are never silently
//! retried across backends.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use thiserror::Error;
use workloom_core::BackendId;

use crate::config::RouterConfig;
use crate::registry::BackendRegistry;
use crate::runtime::BackendError;
use crate::runtime::EmbeddingBackend;
use crate::runtime::EmbeddingRequest;
use crate::runtime::HarnessBackend;
use crate::runtime::HarnessRequest;
use crate::runtime::ResourceKind;
use crate::runtime::RoutedEmbeddings;
use crate::runtime::RoutedHarness;
use crate::runtime::RoutedText;
use crate::runtime::TextBackend;
use crate::runtime::TextRequest;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Routing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `NoAvailableBackend` is tagged with the resource kind that exhausted
///   its candidates.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Every candidate was unregistered, unavailable, or failed.
    #[error("no available backend for {} after {attempted} attempt(s)", kind.as_str())]
    NoAvailableBackend {
        /// Resource kind whose candidates were exhausted.
        kind: ResourceKind,
        /// Number of candidates that were actually attempted.
        attempted: usize,
    },
    /// A side-effecting backend attempt failed and must not be retried.
    #[error("backend {backend_id} failed for {}: {source}", kind.as_str())]
    Backend {
        /// Resource kind of the failed call.
        kind: ResourceKind,
        /// Backend whose attempt failed.
        backend_id: BackendId,
        /// Underlying backend error.
        source: BackendError,
    },
    /// Registration collided with an existing backend identifier.
    #[error("backend already registered: {backend_id}")]
    DuplicateBackend {
        /// Conflicting backend identifier.
        backend_id: BackendId,
    },
}

// ============================================================================
// SECTION: Route Options
// ============================================================================

/// Per-call routing options.
///
/// # Invariants
/// - An explicit backend id takes precedence over every profile entry.
/// - An explicit profile takes precedence over the configured default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteOptions {
    /// Explicit backend to attempt first.
    pub backend: Option<BackendId>,
    /// Profile overriding the router's configured default.
    pub profile: Option<String>,
}

impl RouteOptions {
    /// Returns options selecting an explicit backend.
    #[must_use]
    pub const fn backend(backend: BackendId) -> Self {
        Self {
            backend: Some(backend),
            profile: None,
        }
    }

    /// Returns options selecting an explicit profile.
    #[must_use]
    pub const fn profile(profile: String) -> Self {
        Self {
            backend: None,
            profile: Some(profile),
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Router for one resource kind.
///
/// # Invariants
/// - Immutable after construction apart from the fallback counter.
pub struct Router<R: ?Sized> {
    /// Resource kind served by this router.
    kind: ResourceKind,
    /// Registered backends.
    registry: BackendRegistry<R>,
    /// Profile and fallback configuration.
    config: RouterConfig,
    /// Count of failed retryable attempts that fell through to a later
    /// candidate; read by engine telemetry.
    fallbacks: AtomicU64,
}

/// Router over text generation backends.
pub type TextRouter = Router<dyn TextBackend>;
/// Router over embedding generation backends.
pub type EmbeddingRouter = Router<dyn EmbeddingBackend>;
/// Router over harness execution backends.
pub type HarnessRouter = Router<dyn HarnessBackend>;

impl<R: ?Sized> Router<R> {
    /// Creates a router over the provided registry and configuration.
    #[must_use]
    pub const fn new(kind: ResourceKind, registry: BackendRegistry<R>, config: RouterConfig) -> Self {
        Self {
            kind,
            registry,
            config,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Returns the resource kind served by this router.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the registry backing this router.
    #[must_use]
    pub const fn registry(&self) -> &BackendRegistry<R> {
        &self.registry
    }

    /// Returns the number of failed retryable attempts observed so far.
    #[must_use]
    pub fn fallbacks_observed(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Builds the ordered candidate list for one call.
    ///
    /// Order: explicit id (when given), then the resolved profile's ids,
    /// then the global fallback list. Duplicates keep their first position.
    fn candidates(&self, options: &RouteOptions) -> Vec<BackendId> {
        let profile_name =
            options.profile.as_deref().unwrap_or(self.config.default_profile.as_str());
        let mut ordered = Vec::new();
        if let Some(explicit) = &options.backend {
            ordered.push(explicit.clone());
        }
        if let Some(profile_ids) = self.config.profiles.get(profile_name) {
            ordered.extend(profile_ids.iter().cloned());
        }
        ordered.extend(self.config.fallback.iter().cloned());

        let mut seen = Vec::with_capacity(ordered.len());
        for id in ordered {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    /// Counts one failed retryable attempt.
    fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// SECTION: Text Routing
// ============================================================================

impl Router<dyn TextBackend> {
    /// Routes a text generation call with first-success-wins semantics.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NoAvailableBackend`] when every candidate is
    /// unregistered, unavailable, or fails.
    pub fn generate(
        &self,
        request: &TextRequest,
        options: &RouteOptions,
    ) -> Result<RoutedText, RouteError> {
        let mut attempted = 0;
        for id in self.candidates(options) {
            let Some(backend) = self.registry.get(&id) else {
                continue;
            };
            if !backend.available() {
                continue;
            }
            attempted += 1;
            match backend.generate(request) {
                Ok(text) => {
                    return Ok(RoutedText {
                        backend_id: id,
                        text,
                    });
                }
                Err(_) => {
                    self.record_fallback();
                }
            }
        }
        Err(RouteError::NoAvailableBackend {
            kind: self.kind,
            attempted,
        })
    }
}

// ============================================================================
// SECTION: Embedding Routing
// ============================================================================

impl Router<dyn EmbeddingBackend> {
    /// Routes an embedding call with first-success-wins semantics.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NoAvailableBackend`] when every candidate is
    /// unregistered, unavailable, or fails.
    pub fn embed(
        &self,
        request: &EmbeddingRequest,
        options: &RouteOptions,
    ) -> Result<RoutedEmbeddings, RouteError> {
        let mut attempted = 0;
        for id in self.candidates(options) {
            let Some(backend) = self.registry.get(&id) else {
                continue;
            };
            if !backend.available() {
                continue;
            }
            attempted += 1;
            match backend.embed(request) {
                Ok(vectors) => {
                    return Ok(RoutedEmbeddings {
                        backend_id: id,
                        vectors,
                    });
                }
                Err(_) => {
                    self.record_fallback();
                }
            }
        }
        Err(RouteError::NoAvailableBackend {
            kind: self.kind,
            attempted,
        })
    }
}

// ============================================================================
// SECTION: Harness Routing
// ============================================================================

impl Router<dyn HarnessBackend> {
    /// Routes a harness execution call.
    ///
    /// The candidate walk skips unregistered and unavailable ids exactly as
    /// the retryable routers do, but once a backend has been attempted an
    /// execution error propagates immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Backend`] when the attempted backend fails, or
    /// [`RouteError::NoAvailableBackend`] when no candidate was viable.
    pub fn execute(
        &self,
        request: &HarnessRequest,
        options: &RouteOptions,
    ) -> Result<RoutedHarness, RouteError> {
        for id in self.candidates(options) {
            let Some(backend) = self.registry.get(&id) else {
                continue;
            };
            if !backend.available() {
                continue;
            }
            return match backend.execute(request) {
                Ok(outcome) => Ok(RoutedHarness {
                    backend_id: id,
                    outcome,
                }),
                Err(source) => Err(RouteError::Backend {
                    kind: self.kind,
                    backend_id: id,
                    source,
                }),
            };
        }
        Err(RouteError::NoAvailableBackend {
            kind: self.kind,
            attempted: 0,
        })
    }
}

// crates/workloom-engine/src/isc_registry.rs
// ============================================================================
// Module: Quality Definition Registry
// Description: Init-once registry of quality definitions keyed by artifact kind.
// Purpose: Resolve the quality definition gating each artifact kind.
// Dependencies: workloom-core, thiserror
// ============================================================================

//! ## Overview
//! Quality definitions are registered in one explicit populate step at
//! startup and are read-only thereafter. Lookups before population resolve
//! nothing, so an unpopulated registry gates no artifact kinds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::OnceLock;

use thiserror::Error;
use workloom_core::IscDefinition;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while populating the registry.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IscRegistryError {
    /// The registry was already populated.
    #[error("quality definition registry already populated")]
    AlreadyPopulated,
    /// Two definitions claimed the same artifact kind.
    #[error("duplicate quality definition for artifact kind {artifact_kind}")]
    DuplicateKind {
        /// Conflicting artifact kind.
        artifact_kind: String,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Init-once quality definition registry keyed by artifact kind.
///
/// # Invariants
/// - Populated at most once; definitions are immutable afterwards.
#[derive(Debug, Default)]
pub struct IscRegistry {
    /// Definitions keyed by the artifact kind they gate.
    definitions: OnceLock<BTreeMap<String, IscDefinition>>,
}

impl IscRegistry {
    /// Creates an empty, unpopulated registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the registry with the provided definitions.
    ///
    /// # Errors
    ///
    /// Returns [`IscRegistryError::AlreadyPopulated`] on a second populate
    /// call, or [`IscRegistryError::DuplicateKind`] when two definitions
    /// claim the same artifact kind.
    pub fn populate(&self, definitions: Vec<IscDefinition>) -> Result<(), IscRegistryError> {
        let mut keyed = BTreeMap::new();
        for definition in definitions {
            let kind = definition.artifact_kind.clone();
            if keyed.insert(kind.clone(), definition).is_some() {
                return Err(IscRegistryError::DuplicateKind {
                    artifact_kind: kind,
                });
            }
        }
        self.definitions.set(keyed).map_err(|_rejected| IscRegistryError::AlreadyPopulated)
    }

    /// Returns true when the registry has been populated.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.definitions.get().is_some()
    }

    /// Resolves the definition gating the provided artifact kind, if any.
    #[must_use]
    pub fn definition_for_kind(&self, artifact_kind: &str) -> Option<&IscDefinition> {
        self.definitions.get().and_then(|keyed| keyed.get(artifact_kind))
    }

    /// Returns the artifact kinds with a registered definition.
    #[must_use]
    pub fn gated_kinds(&self) -> Vec<String> {
        self.definitions
            .get()
            .map(|keyed| keyed.keys().cloned().collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

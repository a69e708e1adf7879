// crates/workloom-engine/src/workflow.rs
// ============================================================================
// Module: Workflow Contract
// Description: Workflow trait and the startup-built workflow registry.
// Purpose: Define the extension seam jobs execute through.
// Dependencies: workloom-core, workloom-router, thiserror
// ============================================================================

//! ## Overview
//! A workflow is a named unit of work the runner executes against a job. The
//! contract is a shared trait; every deployable workflow is a concrete type
//! registered in the [`WorkflowRegistry`] at startup. There is no runtime
//! code loading: the registry is built once and read-only afterwards.
//!
//! Declared capabilities replace the default policy grants rather than
//! extending them, so a workflow that declares anything must declare
//! everything it needs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use workloom_core::IscDefinition;
use workloom_core::PolicyError;
use workloom_core::StoreError;
use workloom_core::WorkflowId;
use workloom_router::RouteError;

use crate::context::JobContext;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by workflow execution and the context helpers.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - A raised error fails the job; the runner never retries a run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A capability check failed.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// A routed backend call failed.
    #[error(transparent)]
    Route(#[from] RouteError),
    /// A repository read failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A CRITICAL quality criterion failed and the artifact was withheld.
    #[error(
        "artifact gated by {definition}: {critical_failures} critical criterion failure(s)"
    )]
    QualityGate {
        /// Quality definition that gated the artifact.
        definition: String,
        /// Count of failed CRITICAL ideal criteria.
        critical_failures: usize,
    },
    /// The workflow reported a domain failure.
    #[error("workflow failed: {0}")]
    Failed(String),
}

// ============================================================================
// SECTION: Workflow Trait
// ============================================================================

/// Unit of work the runner executes against one job.
///
/// # Invariants
/// - `run` owns all side effects; everything it wants persisted goes through
///   the context's local buffer.
/// - `verify` is only invoked when `has_verify` returns true and the run
///   finished without setting a final status itself.
pub trait Workflow: Send + Sync {
    /// Returns the workflow identifier jobs reference.
    fn id(&self) -> WorkflowId;

    /// Returns the declared capability tokens, when the workflow declares any.
    ///
    /// `None` selects the default policy. Declared tokens replace the
    /// default grants apart from `db:read`.
    fn capabilities(&self) -> Option<Vec<String>> {
        None
    }

    /// Returns the workflow's own quality definition override, if any.
    ///
    /// An override takes precedence over the global registry for artifact
    /// kinds it names.
    fn quality_definition(&self) -> Option<IscDefinition> {
        None
    }

    /// Executes the workflow against the job input.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the run fails; the runner flushes
    /// partial progress and fails the job.
    fn run(&self, context: &JobContext, input: &Value) -> Result<(), WorkflowError>;

    /// Returns true when the workflow provides a verification hook.
    fn has_verify(&self) -> bool {
        false
    }

    /// Post-run verification hook.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when verification fails; the job is failed.
    fn verify(&self, context: &JobContext) -> Result<(), WorkflowError> {
        let _ = context;
        Ok(())
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Errors raised while building the workflow registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowRegistryError {
    /// Registration collided with an existing workflow identifier.
    #[error("workflow already registered: {workflow_id}")]
    Duplicate {
        /// Conflicting workflow identifier.
        workflow_id: WorkflowId,
    },
}

/// Name-to-implementation workflow map built once at startup.
///
/// # Invariants
/// - Identifiers are unique; duplicate registration is rejected.
/// - Read-only after startup; the runner only resolves.
#[derive(Default)]
pub struct WorkflowRegistry {
    /// Registered workflows keyed by identifier.
    workflows: BTreeMap<WorkflowId, Arc<dyn Workflow>>,
}

impl WorkflowRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a workflow under its own identifier.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRegistryError::Duplicate`] when the identifier is
    /// already taken.
    pub fn register(&mut self, workflow: Arc<dyn Workflow>) -> Result<(), WorkflowRegistryError> {
        let id = workflow.id();
        if self.workflows.contains_key(&id) {
            return Err(WorkflowRegistryError::Duplicate {
                workflow_id: id,
            });
        }
        self.workflows.insert(id, workflow);
        Ok(())
    }

    /// Resolves a workflow by identifier.
    #[must_use]
    pub fn get(&self, id: &WorkflowId) -> Option<Arc<dyn Workflow>> {
        self.workflows.get(id).cloned()
    }

    /// Returns the registered identifiers in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<WorkflowId> {
        self.workflows.keys().cloned().collect()
    }
}

// crates/workloom-engine/src/gated.rs
// ============================================================================
// Module: Gated Runtimes
// Description: Policy-gated, routed, and traced runtime handles for one job.
// Purpose: Put every backend call behind a capability check and a trace row.
// Dependencies: workloom-core, workloom-router, serde_json
// ============================================================================

//! ## Overview
//! Workflows never touch a router directly. Each job execution receives a
//! [`GatedRuntimes`] handle that checks the policy, routes the call, and
//! appends a trace event to the job's local buffer. Traces carry backend
//! provenance and sizes, never prompt or artifact content.
//! Invariants:
//! - A denied capability raises before any backend is contacted.
//! - Harness execution requires `exec:<tool>`; the `exec:*` family covers
//!   every tool.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::json;
use workloom_core::Command;
use workloom_core::CommandSink;
use workloom_core::JobId;
use workloom_core::LocalCommandBuffer;
use workloom_core::Policy;
use workloom_core::Timestamp;
use workloom_core::TraceEvent;
use workloom_core::policy::CAP_EMBEDDINGS_GENERATE;
use workloom_core::policy::CAP_LLM_GENERATE;
use workloom_router::EmbeddingRequest;
use workloom_router::EmbeddingRouter;
use workloom_router::HarnessRequest;
use workloom_router::HarnessRouter;
use workloom_router::ResourceKind;
use workloom_router::RouteError;
use workloom_router::RouteOptions;
use workloom_router::RoutedEmbeddings;
use workloom_router::RoutedHarness;
use workloom_router::RoutedText;
use workloom_router::TextRequest;
use workloom_router::TextRouter;

use crate::context::EngineIds;
use crate::workflow::WorkflowError;

// ============================================================================
// SECTION: Runtime Handle
// ============================================================================

/// Policy-gated runtime handle scoped to one job execution.
///
/// # Invariants
/// - Every successful call appends exactly one trace event to the local
///   buffer.
pub struct GatedRuntimes {
    /// Capability policy for the executing workflow.
    policy: Policy,
    /// Routed text generation, when configured.
    text: Option<Arc<TextRouter>>,
    /// Routed embedding generation, when configured.
    embeddings: Option<Arc<EmbeddingRouter>>,
    /// Routed harness execution, when configured.
    harness: Option<Arc<HarnessRouter>>,
    /// Local buffer receiving trace events.
    buffer: Arc<LocalCommandBuffer>,
    /// Job the traces belong to.
    job_id: JobId,
    /// Shared identifier generators.
    ids: Arc<EngineIds>,
}

impl GatedRuntimes {
    /// Creates a runtime handle for one job execution.
    #[must_use]
    pub fn new(
        policy: Policy,
        text: Option<Arc<TextRouter>>,
        embeddings: Option<Arc<EmbeddingRouter>>,
        harness: Option<Arc<HarnessRouter>>,
        buffer: Arc<LocalCommandBuffer>,
        job_id: JobId,
        ids: Arc<EngineIds>,
    ) -> Self {
        Self {
            policy,
            text,
            embeddings,
            harness,
            buffer,
            job_id,
            ids,
        }
    }

    /// Routes a gated text generation call.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Policy`] when `llm:generate` is not granted,
    /// or [`WorkflowError::Route`] when routing fails.
    pub fn generate(
        &self,
        request: &TextRequest,
        options: &RouteOptions,
    ) -> Result<RoutedText, WorkflowError> {
        self.policy.require(CAP_LLM_GENERATE, Some("runtime.text.generate"))?;
        let router = self.text.as_ref().ok_or_else(|| {
            WorkflowError::Route(RouteError::NoAvailableBackend {
                kind: ResourceKind::TextGeneration,
                attempted: 0,
            })
        })?;
        let routed = router.generate(request, options)?;
        self.trace(
            "runtime.text.generate",
            json!({
                "backend_id": &routed.backend_id,
                "prompt_chars": request.prompt.chars().count(),
                "text_chars": routed.text.chars().count(),
            }),
        );
        Ok(routed)
    }

    /// Routes a gated embedding generation call.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Policy`] when `embeddings:generate` is not
    /// granted, or [`WorkflowError::Route`] when routing fails.
    pub fn embed(
        &self,
        request: &EmbeddingRequest,
        options: &RouteOptions,
    ) -> Result<RoutedEmbeddings, WorkflowError> {
        self.policy.require(CAP_EMBEDDINGS_GENERATE, Some("runtime.embeddings.generate"))?;
        let router = self.embeddings.as_ref().ok_or_else(|| {
            WorkflowError::Route(RouteError::NoAvailableBackend {
                kind: ResourceKind::EmbeddingGeneration,
                attempted: 0,
            })
        })?;
        let routed = router.embed(request, options)?;
        self.trace(
            "runtime.embeddings.generate",
            json!({
                "backend_id": &routed.backend_id,
                "inputs": request.inputs.len(),
                "vectors": routed.vectors.len(),
            }),
        );
        Ok(routed)
    }

    /// Routes a gated harness execution call.
    ///
    /// The required capability is `exec:<tool>`; the wildcard family
    /// `exec:*` covers every tool.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Policy`] when the tool capability is not
    /// granted, or [`WorkflowError::Route`] when routing or execution fails.
    pub fn execute(
        &self,
        request: &HarnessRequest,
        options: &RouteOptions,
    ) -> Result<RoutedHarness, WorkflowError> {
        let capability = format!("exec:{}", request.tool);
        self.policy.require(&capability, Some("runtime.harness.execute"))?;
        let router = self.harness.as_ref().ok_or_else(|| {
            WorkflowError::Route(RouteError::NoAvailableBackend {
                kind: ResourceKind::HarnessExecution,
                attempted: 0,
            })
        })?;
        let routed = router.execute(request, options)?;
        self.trace(
            "runtime.harness.execute",
            json!({
                "backend_id": &routed.backend_id,
                "tool": &request.tool,
                "apply": request.apply,
                "exit_code": routed.outcome.exit_code,
            }),
        );
        Ok(routed)
    }

    /// Appends one trace event to the job's local buffer.
    fn trace(&self, kind: &str, payload: serde_json::Value) {
        self.buffer.enqueue(Command::TraceEmit {
            event: TraceEvent {
                id: self.ids.traces.issue(),
                job_id: Some(self.job_id.clone()),
                kind: kind.to_string(),
                payload,
                at: Timestamp::now(),
            },
        });
    }
}

// crates/workloom-router/src/runtime.rs
// ============================================================================
// Module: Backend Runtime Contracts
// Description: Backend traits and request/response shapes per resource kind.
// Purpose: Define the seams concrete backends implement for routing.
// Dependencies: workloom-core, serde, thiserror
// ============================================================================

//! ## Overview
//! Backends implement one of three runtime traits. Each trait pairs an
//! availability probe with a call method; the router re-evaluates the probe
//! on every attempt so a backend that loses its binary or endpoint is
//! skipped on the next call without caller changes. Routed results carry the
//! winning backend id as their provenance field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use workloom_core::BackendId;

// ============================================================================
// SECTION: Resource Kinds
// ============================================================================

/// Resource kind served by a router instantiation.
///
/// # Invariants
/// - Variants are stable for error tagging and configuration matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Text generation backends.
    TextGeneration,
    /// Embedding generation backends.
    EmbeddingGeneration,
    /// Tool/harness execution backends.
    HarnessExecution,
}

impl ResourceKind {
    /// Returns the stable label for the resource kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextGeneration => "text_generation",
            Self::EmbeddingGeneration => "embedding_generation",
            Self::HarnessExecution => "harness_execution",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by backend call attempts.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend rejected or failed the call.
    #[error("backend call failed: {0}")]
    Call(String),
    /// Backend response could not be decoded.
    #[error("backend response invalid: {0}")]
    InvalidResponse(String),
    /// Backend call exceeded its timeout.
    #[error("backend call timed out after {timeout_ms} ms")]
    TimedOut {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },
}

// ============================================================================
// SECTION: Text Generation
// ============================================================================

/// Text generation request.
///
/// # Invariants
/// - `prompt` is the full user prompt; `system` is an optional preamble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRequest {
    /// User prompt text.
    pub prompt: String,
    /// Optional system preamble.
    pub system: Option<String>,
    /// Optional completion token cap.
    pub max_tokens: Option<u32>,
}

impl TextRequest {
    /// Creates a request with only a prompt.
    #[must_use]
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            max_tokens: None,
        }
    }
}

/// Routed text generation result with provenance.
///
/// # Invariants
/// - `backend_id` names the backend whose attempt succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedText {
    /// Winning backend identifier.
    pub backend_id: BackendId,
    /// Generated text.
    pub text: String,
}

/// Text generation backend.
pub trait TextBackend: Send + Sync {
    /// Returns true when the backend can currently serve calls.
    fn available(&self) -> bool;

    /// Generates text for the request.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the call fails.
    fn generate(&self, request: &TextRequest) -> Result<String, BackendError>;
}

// ============================================================================
// SECTION: Embedding Generation
// ============================================================================

/// Embedding generation request.
///
/// # Invariants
/// - One output vector is produced per input string, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Input strings to embed.
    pub inputs: Vec<String>,
    /// Optional model override.
    pub model: Option<String>,
}

/// Routed embedding result with provenance.
///
/// # Invariants
/// - `vectors.len()` equals the request's input count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedEmbeddings {
    /// Winning backend identifier.
    pub backend_id: BackendId,
    /// Output vectors, one per input.
    pub vectors: Vec<Vec<f32>>,
}

/// Embedding generation backend.
pub trait EmbeddingBackend: Send + Sync {
    /// Returns true when the backend can currently serve calls.
    fn available(&self) -> bool;

    /// Embeds the request inputs.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the call fails.
    fn embed(&self, request: &EmbeddingRequest) -> Result<Vec<Vec<f32>>, BackendError>;
}

// ============================================================================
// SECTION: Harness Execution
// ============================================================================

/// Tool/harness execution request.
///
/// # Invariants
/// - `apply` marks side-effecting executions; routers never retry those
///   across backends after an attempt has started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessRequest {
    /// Tool name or subcommand to run.
    pub tool: String,
    /// Tool arguments.
    pub args: Vec<String>,
    /// Optional stdin payload.
    pub stdin: Option<String>,
    /// Optional per-call timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// True when the execution mutates external state.
    pub apply: bool,
}

/// Outcome of one harness execution.
///
/// # Invariants
/// - `exit_code` is `-1` when the process terminated without a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessOutcome {
    /// Process exit code.
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

/// Routed harness result with provenance.
///
/// # Invariants
/// - `backend_id` names the backend that executed the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedHarness {
    /// Winning backend identifier.
    pub backend_id: BackendId,
    /// Execution outcome.
    pub outcome: HarnessOutcome,
}

/// Tool/harness execution backend.
pub trait HarnessBackend: Send + Sync {
    /// Returns true when the backend can currently serve calls.
    fn available(&self) -> bool;

    /// Executes the harness request.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the execution fails to start or times
    /// out. A nonzero exit code is an outcome, not an error.
    fn execute(&self, request: &HarnessRequest) -> Result<HarnessOutcome, BackendError>;
}

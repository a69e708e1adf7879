// crates/workloom-core/src/core/artifact.rs
// ============================================================================
// Module: Workloom Artifacts
// Description: Durable typed outputs produced by workflow runs.
// Purpose: Define the artifact record shared by the runner, verifier, and store.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An artifact is the durable output of a workflow run. Artifacts are created
//! once via `artifact.create` and optionally patched via `artifact.update`.
//! An artifact whose kind has a registered quality definition with a failed
//! CRITICAL criterion must never reach the command queue; the runner enforces
//! that gate before enqueueing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ArtifactId;
use crate::core::identifiers::JobId;

// ============================================================================
// SECTION: Artifact Record
// ============================================================================

/// Artifact kind used by the runner for approval-request bookkeeping.
pub const APPROVAL_REQUEST_KIND: &str = "approval.request";

/// Durable artifact record.
///
/// # Invariants
/// - `kind` selects the quality definition used to gate the artifact.
/// - `data` is opaque to the store; the runner may attach a compact
///   verification summary under the `verification` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact identifier.
    pub id: ArtifactId,
    /// Artifact kind (for example `plain.v1`).
    pub kind: String,
    /// Job that produced the artifact, when known.
    pub job_id: Option<JobId>,
    /// Optional human-readable title.
    pub title: Option<String>,
    /// Optional markdown content body.
    pub content_md: Option<String>,
    /// Structured payload data.
    pub data: Value,
}

impl Artifact {
    /// Creates an artifact with empty optional fields and a null payload.
    #[must_use]
    pub fn new(id: ArtifactId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            job_id: None,
            title: None,
            content_md: None,
            data: Value::Null,
        }
    }

    /// Returns the verifiable text content of the artifact, if any.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content_md.as_deref()
    }
}
